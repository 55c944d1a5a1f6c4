use crate::devices::types::{Device, DeviceContext, day_position};
use crate::sim::types::SimConfig;

/// Which thermal load a heat pump serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatPumpKind {
    /// Building space heating, driven by the indoor set temperature.
    SpaceHeating,
    /// Domestic hot water storage.
    Dhw,
}

/// Thermal parameters of a [`HeatPump`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatPumpParams {
    /// Electrical rating (W); demand never exceeds it.
    pub rated_w: f64,
    /// Coefficient of performance (thermal W per electrical W).
    pub cop: f64,
    /// Space heating: building heat loss coefficient (W/K).
    /// DHW: average thermal draw (W).
    pub thermal_w: f64,
    /// Space heating: indoor set temperature (°C). Unused for DHW.
    pub set_temperature_c: f64,
    /// Space heating: daily mean outdoor temperature (°C). Unused for DHW.
    pub outdoor_mean_c: f64,
    /// Space heating: daily outdoor swing (°C). DHW: peak-to-mean ratio of
    /// the morning and evening draws.
    pub swing: f64,
    /// Extra electrical demand per °C of EMS temperature offset (W/K).
    pub boost_w_per_k: f64,
}

/// A heat pump whose electrical demand follows a thermal load and rises
/// while the EMS raises its set temperature.
///
/// The EMS offset (°C) arrives in `context.signal`: the sum of the building
/// indoor and space-heating storage offsets for space heating, the hot water
/// storage offset for DHW.
#[derive(Debug, Clone)]
pub struct HeatPump {
    pub kind: HeatPumpKind,
    pub params: HeatPumpParams,
    steps_per_day: usize,
}

impl HeatPump {
    /// Creates a heat pump.
    ///
    /// # Panics
    ///
    /// Panics if `cop <= 0` or `rated_w < 0`.
    pub fn new(kind: HeatPumpKind, params: HeatPumpParams, config: &SimConfig) -> Self {
        assert!(params.cop > 0.0);
        assert!(params.rated_w >= 0.0);
        Self {
            kind,
            params,
            steps_per_day: config.steps_per_day,
        }
    }

    /// Outdoor temperature at `timestep` (°C), coldest before dawn.
    pub fn outdoor_temperature_c(&self, timestep: usize) -> f64 {
        let pos = day_position(timestep, self.steps_per_day);
        // Minimum at 03:00, maximum at 15:00.
        let angle = 2.0 * std::f64::consts::PI * (pos - 0.375);
        self.params.outdoor_mean_c + 0.5 * self.params.swing * angle.sin()
    }

    /// Thermal load before any EMS offset (W).
    pub fn thermal_load_w(&self, timestep: usize) -> f64 {
        let p = &self.params;
        match self.kind {
            HeatPumpKind::SpaceHeating => {
                let gap = p.set_temperature_c - self.outdoor_temperature_c(timestep);
                p.thermal_w * gap.max(0.0)
            }
            HeatPumpKind::Dhw => {
                let hour = 24.0 * day_position(timestep, self.steps_per_day);
                let bump = |centre: f64| (-((hour - centre) / 1.5).powi(2)).exp();
                p.thermal_w * (1.0 + p.swing * (bump(7.0) + bump(19.0)))
            }
        }
    }
}

impl Device for HeatPump {
    fn power_w(&mut self, context: &DeviceContext) -> f64 {
        let offset_c = context.signal.unwrap_or(0.0).max(0.0);
        let base_w = self.thermal_load_w(context.timestep) / self.params.cop;
        (base_w + self.params.boost_w_per_k * offset_c).clamp(0.0, self.params.rated_w)
    }

    fn device_type(&self) -> &'static str {
        match self.kind {
            HeatPumpKind::SpaceHeating => "HeatPump",
            HeatPumpKind::Dhw => "DhwHeatPump",
        }
    }
}
