use crate::devices::types::{Device, DeviceContext};
use crate::sim::types::SimConfig;

/// A stationary home battery that follows the EMS power target.
///
/// The EMS offers the battery the running surplus as its target: a positive
/// target is charged (limited by power and free capacity), a negative target
/// is discharged to cover the deficit (limited by power and stored energy).
///
/// # Sign convention
/// - Positive power: charging (consumption)
/// - Negative power: discharging (supply)
#[derive(Debug, Clone)]
pub struct Battery {
    /// Usable capacity (Wh).
    pub capacity_wh: f64,

    /// State of charge as a fraction (0.0 to 1.0).
    pub soc: f64,

    /// Maximum charge power (W, positive).
    pub max_charge_w: f64,

    /// Maximum discharge power (W, positive).
    pub max_discharge_w: f64,

    /// Charging efficiency (0..1.0).
    pub eta_c: f64,

    /// Discharging efficiency (0..1.0).
    pub eta_d: f64,

    dt_hours: f64,
    saved_soc: f64,
}

impl Battery {
    /// Creates a battery.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero/negative, SOC out of range, or efficiencies invalid.
    pub fn new(
        capacity_wh: f64,
        soc: f64,
        max_charge_w: f64,
        max_discharge_w: f64,
        eta_c: f64,
        eta_d: f64,
        config: &SimConfig,
    ) -> Self {
        assert!(capacity_wh > 0.0);
        assert!((0.0..=1.0).contains(&soc));
        assert!(max_charge_w >= 0.0 && max_discharge_w >= 0.0);
        assert!(eta_c > 0.0 && eta_c <= 1.0);
        assert!(eta_d > 0.0 && eta_d <= 1.0);

        Self {
            capacity_wh,
            soc,
            max_charge_w,
            max_discharge_w,
            eta_c,
            eta_d,
            dt_hours: config.dt_hours,
            saved_soc: soc,
        }
    }

    /// Remembers the current state of charge.
    pub fn save_state(&mut self) {
        self.saved_soc = self.soc;
    }

    /// Returns to the state of charge captured by [`save_state`](Self::save_state).
    pub fn restore_state(&mut self) {
        self.soc = self.saved_soc;
    }

    /// Stored energy (Wh).
    pub fn stored_wh(&self) -> f64 {
        self.soc * self.capacity_wh
    }
}

impl Device for Battery {
    /// Applies the EMS target carried in `context.signal` and returns the
    /// power actually exchanged.
    fn power_w(&mut self, context: &DeviceContext) -> f64 {
        let target_w = context.signal.unwrap_or(0.0);

        let cmd_w = if target_w >= 0.0 {
            target_w.min(self.max_charge_w)
        } else {
            target_w.max(-self.max_discharge_w)
        };

        if cmd_w > 0.0 {
            let room_wh = (1.0 - self.soc) * self.capacity_wh / self.eta_c;
            let actual_w = cmd_w.min((room_wh / self.dt_hours).max(0.0));

            self.soc += actual_w * self.dt_hours * self.eta_c / self.capacity_wh;
            self.soc = self.soc.clamp(0.0, 1.0);
            actual_w
        } else if cmd_w < 0.0 {
            let available_wh = self.soc * self.capacity_wh * self.eta_d;
            let actual_abs_w = (-cmd_w).min((available_wh / self.dt_hours).max(0.0));

            self.soc -= actual_abs_w * self.dt_hours / (self.capacity_wh * self.eta_d);
            self.soc = self.soc.clamp(0.0, 1.0);
            -actual_abs_w
        } else {
            0.0
        }
    }

    fn device_type(&self) -> &'static str {
        "Battery"
    }
}
