//! Post-hoc KPI computation from simulation results.

use std::fmt;

use serde::Serialize;

use super::types::StepResult;

/// Aggregate key performance indicators derived from a complete simulation run.
///
/// Computed post-hoc from `Vec<StepResult>` to ensure consistency between
/// step data and reported metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiReport {
    /// Local production: PV plus district feed (kWh).
    pub production_kwh: f64,
    /// Household consumption excluding battery charging (kWh).
    pub consumption_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
    /// Share of local production not exported (0..=1).
    pub self_consumption_ratio: f64,
    /// Share of consumption not imported (0..=1).
    pub autarky_ratio: f64,
    pub peak_import_w: f64,
    pub peak_export_w: f64,
    /// Total battery energy throughput (kWh, sum of |power| * dt).
    pub battery_throughput_kwh: f64,
    /// Battery equivalent full cycles (throughput / 2*capacity).
    pub battery_equivalent_full_cycles: f64,
    /// Steps with at least one raised temperature offset.
    pub setpoint_active_steps: usize,
    /// Steps whose device readings did not settle.
    pub non_converged_steps: usize,
    /// Most rounds any tie group needed over the run.
    pub max_tie_rounds: usize,
}

impl KpiReport {
    /// Computes all KPIs from the complete step record vector.
    pub fn from_results(results: &[StepResult], dt_hours: f64, battery_capacity_wh: f64) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let to_kwh = |w: f64| w * dt_hours / 1000.0;
        let mut kpi = Self::default();

        for r in results {
            kpi.production_kwh += to_kwh(r.pv_w + r.district_feed_w);
            kpi.consumption_kwh +=
                to_kwh(r.appliances_w + r.residents_w + r.heat_pump_w + r.dhw_w + r.car_w);
            kpi.grid_import_kwh += to_kwh(r.import_w());
            kpi.grid_export_kwh += to_kwh(r.export_w());

            kpi.peak_import_w = kpi.peak_import_w.max(r.import_w());
            kpi.peak_export_w = kpi.peak_export_w.max(r.export_w());
            kpi.battery_throughput_kwh += to_kwh(r.battery_w.abs());

            if r.setpoints_raised() {
                kpi.setpoint_active_steps += 1;
            }
            if !r.converged {
                kpi.non_converged_steps += 1;
            }
            kpi.max_tie_rounds = kpi.max_tie_rounds.max(r.tie_rounds);
        }

        kpi.self_consumption_ratio = ratio(
            kpi.production_kwh - kpi.grid_export_kwh,
            kpi.production_kwh,
        );
        kpi.autarky_ratio = ratio(kpi.consumption_kwh - kpi.grid_import_kwh, kpi.consumption_kwh);
        if battery_capacity_wh > 0.0 {
            kpi.battery_equivalent_full_cycles =
                kpi.battery_throughput_kwh * 1000.0 / (2.0 * battery_capacity_wh);
        }

        kpi
    }
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Production:            {:.2} kWh", self.production_kwh)?;
        writeln!(f, "Consumption:           {:.2} kWh", self.consumption_kwh)?;
        writeln!(
            f,
            "Grid import / export:  {:.2} / {:.2} kWh",
            self.grid_import_kwh, self.grid_export_kwh
        )?;
        writeln!(f, "Self-consumption:      {:.1}%", self.self_consumption_ratio * 100.0)?;
        writeln!(f, "Autarky:               {:.1}%", self.autarky_ratio * 100.0)?;
        writeln!(f, "Peak import:           {:.0} W", self.peak_import_w)?;
        writeln!(f, "Peak export:           {:.0} W", self.peak_export_w)?;
        writeln!(
            f,
            "Battery throughput:    {:.2} kWh ({:.2} equiv. cycles)",
            self.battery_throughput_kwh, self.battery_equivalent_full_cycles
        )?;
        writeln!(f, "Setpoint-active steps: {}", self.setpoint_active_steps)?;
        writeln!(f, "Max tie rounds:        {}", self.max_tie_rounds)?;
        write!(f, "Non-converged steps:   {}", self.non_converged_steps)
    }
}
