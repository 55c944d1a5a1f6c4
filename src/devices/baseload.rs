use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext, day_position, gaussian_noise};

/// A sinusoidal daily consumption profile.
///
/// Used for both the residents' load (controllable, weighted by the EMS) and
/// the always-on appliance load that the EMS only counts.
///
/// # Examples
///
/// ```
/// use ems_sim::devices::baseload::BaseLoad;
///
/// let mut load = BaseLoad::new(400.0, 250.0, 1.2, 0.0, 24, 42);
/// let demand = load.demand_w(12);
/// assert!(demand >= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    /// Mean consumption (W).
    pub base_w: f64,

    /// Amplitude of the daily variation (W).
    pub amp_w: f64,

    /// Phase offset of the sinusoid (rad).
    pub phase_rad: f64,

    /// Standard deviation of the Gaussian noise (W).
    pub noise_std_w: f64,

    /// Number of time steps per simulated day.
    pub steps_per_day: usize,

    rng: StdRng,
}

impl BaseLoad {
    pub fn new(
        base_w: f64,
        amp_w: f64,
        phase_rad: f64,
        noise_std_w: f64,
        steps_per_day: usize,
        seed: u64,
    ) -> Self {
        Self {
            base_w,
            amp_w,
            phase_rad,
            noise_std_w,
            steps_per_day: steps_per_day.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Demand at `timestep` (W), never negative.
    pub fn demand_w(&mut self, timestep: usize) -> f64 {
        let angle =
            2.0 * std::f64::consts::PI * day_position(timestep, self.steps_per_day) + self.phase_rad;
        let noise = gaussian_noise(&mut self.rng, self.noise_std_w);
        (self.base_w + self.amp_w * angle.sin() + noise).max(0.0)
    }
}

impl Device for BaseLoad {
    fn power_w(&mut self, context: &DeviceContext) -> f64 {
        self.demand_w(context.timestep)
    }

    fn device_type(&self) -> &'static str {
        "BaseLoad"
    }
}
