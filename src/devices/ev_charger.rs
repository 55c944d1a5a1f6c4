use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext};
use crate::sim::types::SimConfig;

/// One plug-in of the car: connected from `plug_in` until `plug_out`
/// (steps within the day, exclusive end).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PlugIn {
    plug_in: usize,
    plug_out: usize,
    missing_wh: f64,
}

/// The household car battery, charged at home once per day.
///
/// Every day starts with a fresh plug-in window and energy need drawn from
/// the configured ranges. While plugged in the car charges at full power
/// until the need is met; the need is capped at what the window can deliver.
#[derive(Debug, Clone)]
pub struct EvCharger {
    /// Charger power limit (W).
    pub max_charge_w: f64,
    /// Daily energy need range (Wh).
    pub need_wh: (f64, f64),
    /// Plug-in duration range (timesteps).
    pub window_steps: (usize, usize),
    steps_per_day: usize,
    dt_hours: f64,
    planned_day: Option<usize>,
    plug: PlugIn,
    rng: StdRng,
}

impl EvCharger {
    /// Creates a charger.
    ///
    /// # Panics
    ///
    /// Panics if `max_charge_w <= 0`, if a range is inverted or negative, or
    /// if the shortest plug-in window is zero steps.
    pub fn new(
        max_charge_w: f64,
        demand_wh_min: f64,
        demand_wh_max: f64,
        dwell_steps_min: usize,
        dwell_steps_max: usize,
        config: &SimConfig,
        seed: u64,
    ) -> Self {
        assert!(max_charge_w > 0.0);
        assert!(demand_wh_min >= 0.0 && demand_wh_min <= demand_wh_max);
        assert!(dwell_steps_min > 0 && dwell_steps_min <= dwell_steps_max);

        Self {
            max_charge_w,
            need_wh: (demand_wh_min, demand_wh_max),
            window_steps: (dwell_steps_min, dwell_steps_max),
            steps_per_day: config.steps_per_day,
            dt_hours: config.dt_hours,
            planned_day: None,
            plug: PlugIn::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn plan_day(&mut self) -> PlugIn {
        let longest = self.window_steps.1.min(self.steps_per_day);
        let shortest = self.window_steps.0.min(longest);
        let len = self.rng.random_range(shortest..=longest);
        let plug_in = self.rng.random_range(0..=self.steps_per_day - len);
        let need_wh = self.rng.random_range(self.need_wh.0..=self.need_wh.1);

        PlugIn {
            plug_in,
            plug_out: plug_in + len,
            missing_wh: need_wh.min(self.max_charge_w * self.dt_hours * len as f64),
        }
    }

    /// Session of the day containing `timestep`, planned on first use.
    fn session(&mut self, timestep: usize) -> &mut PlugIn {
        let day = timestep / self.steps_per_day;
        if self.planned_day != Some(day) {
            self.plug = self.plan_day();
            self.planned_day = Some(day);
        }
        &mut self.plug
    }

    /// Power the car would draw at `timestep` without any cap (W).
    pub fn requested_power_w(&mut self, context: &DeviceContext) -> f64 {
        let day_t = context.timestep % self.steps_per_day;
        let max_w = self.max_charge_w;
        let dt = self.dt_hours;
        let s = self.session(context.timestep);

        if !(s.plug_in..s.plug_out).contains(&day_t) || s.missing_wh <= 0.0 {
            return 0.0;
        }
        (s.missing_wh / dt).min(max_w)
    }

    /// Whether today's plug-in still has energy to deliver.
    pub fn is_charging(&self) -> bool {
        self.planned_day.is_some() && self.plug.missing_wh > 0.0
    }
}

impl Device for EvCharger {
    /// Charges the car and returns the delivered power (W).
    ///
    /// An optional `context.signal` caps the charging power.
    fn power_w(&mut self, context: &DeviceContext) -> f64 {
        let cap_w = context.signal.map_or(self.max_charge_w, |w| w.max(0.0));
        let charge_w = self.requested_power_w(context).min(cap_w);
        if charge_w <= 0.0 {
            return 0.0;
        }

        let dt = self.dt_hours;
        let s = self.session(context.timestep);
        s.missing_wh = (s.missing_wh - charge_w * dt).max(0.0);
        charge_w
    }

    fn device_type(&self) -> &'static str {
        "CarBattery"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SimConfig {
        SimConfig::new(24, 1, 0)
    }

    fn ctx(t: usize) -> DeviceContext {
        DeviceContext::new(t)
    }

    fn energy_wh(ev: &mut EvCharger, steps: std::ops::Range<usize>, dt: f64) -> f64 {
        steps.map(|t| ev.power_w(&ctx(t)) * dt).sum()
    }

    #[test]
    fn same_seed_gives_same_sessions() {
        let c = cfg();
        let mut a = EvCharger::new(7200.0, 6000.0, 12_000.0, 4, 10, &c, 42);
        let mut b = EvCharger::new(7200.0, 6000.0, 12_000.0, 4, 10, &c, 42);
        for t in 0..48 {
            assert_eq!(a.power_w(&ctx(t)), b.power_w(&ctx(t)));
        }
    }

    #[test]
    fn no_need_means_no_charging() {
        let mut ev = EvCharger::new(7200.0, 0.0, 0.0, 4, 4, &cfg(), 7);
        assert_eq!(energy_wh(&mut ev, 0..24, 1.0), 0.0);
        assert!(!ev.is_charging());
    }

    #[test]
    fn charges_at_full_power_until_the_need_is_met() {
        let c = cfg();
        let mut ev = EvCharger::new(4000.0, 10_000.0, 10_000.0, 6, 6, &c, 99);
        let draws: Vec<f64> = (0..24).map(|t| ev.power_w(&ctx(t))).collect();

        let charging: Vec<f64> = draws.into_iter().filter(|w| *w > 0.0).collect();
        assert_eq!(charging, [4000.0, 4000.0, 2000.0]);
        assert!(!ev.is_charging());
    }

    #[test]
    fn need_is_capped_by_the_window() {
        let c = cfg();
        // Two steps at 3 kW can deliver 6 kWh of the 20 kWh asked for.
        let mut ev = EvCharger::new(3000.0, 20_000.0, 20_000.0, 2, 2, &c, 3);
        assert!((energy_wh(&mut ev, 0..24, c.dt_hours) - 6000.0).abs() < 1e-9);
    }

    #[test]
    fn a_new_day_plans_a_new_session() {
        let c = SimConfig::new(24, 2, 0);
        let mut ev = EvCharger::new(7200.0, 5000.0, 5000.0, 3, 3, &c, 11);
        assert!((energy_wh(&mut ev, 0..24, c.dt_hours) - 5000.0).abs() < 1e-9);
        assert!((energy_wh(&mut ev, 24..48, c.dt_hours) - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn signal_caps_charging_power() {
        let c = cfg();
        let mut ev = EvCharger::new(7200.0, 20_000.0, 20_000.0, 3, 3, &c, 5);
        let capped: Vec<f64> = (0..24)
            .map(|t| ev.power_w(&DeviceContext::with_signal(t, 1000.0)))
            .collect();
        assert!(capped.iter().all(|&w| w <= 1000.0));
        assert!(capped.iter().any(|&w| w > 0.0));
    }
}
