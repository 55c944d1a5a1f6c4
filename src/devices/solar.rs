use std::ops::Range;

use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext, daylight_frac, gaussian_noise};
use crate::sim::types::SimConfig;

/// Rooftop PV array feeding the household production port.
///
/// Clear-sky output follows a half-sine between sunrise and sunset and is
/// scaled by multiplicative Gaussian noise for passing clouds. Output is
/// positive production (W).
#[derive(Debug, Clone)]
pub struct SolarPv {
    /// Clear-sky output at solar noon (W).
    pub peak_w: f64,
    /// Steps of the day with daylight.
    pub daylight: Range<usize>,
    /// Cloud noise standard deviation as a fraction of output.
    pub noise_std: f64,
    steps_per_day: usize,
    rng: StdRng,
}

impl SolarPv {
    /// Creates a PV array.
    ///
    /// # Panics
    ///
    /// Panics unless `sunrise_idx < sunset_idx <= steps_per_day`.
    pub fn new(
        peak_w: f64,
        sunrise_idx: usize,
        sunset_idx: usize,
        noise_std: f64,
        config: &SimConfig,
        seed: u64,
    ) -> Self {
        assert!(sunrise_idx < sunset_idx && sunset_idx <= config.steps_per_day);
        Self {
            peak_w: peak_w.max(0.0),
            daylight: sunrise_idx..sunset_idx,
            noise_std: noise_std.max(0.0),
            steps_per_day: config.steps_per_day,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Output without cloud noise (W).
    pub fn clear_sky_w(&self, timestep: usize) -> f64 {
        self.peak_w
            * daylight_frac(
                timestep,
                self.steps_per_day,
                self.daylight.start,
                self.daylight.end,
            )
    }
}

impl Device for SolarPv {
    fn power_w(&mut self, context: &DeviceContext) -> f64 {
        let clear_w = self.clear_sky_w(context.timestep);
        if clear_w <= 0.0 {
            return 0.0;
        }
        let clouds = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
        (clear_w * clouds).max(0.0)
    }

    fn device_type(&self) -> &'static str {
        "SolarPV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> SimConfig {
        SimConfig::new(24, 1, 0)
    }

    #[test]
    #[should_panic]
    fn sunset_must_follow_sunrise() {
        SolarPv::new(5000.0, 18, 6, 0.05, &day(), 42);
    }

    #[test]
    fn dark_outside_the_daylight_window() {
        let mut pv = SolarPv::new(5000.0, 6, 18, 0.2, &day(), 42);
        for t in [0, 5, 18, 23, 29] {
            assert_eq!(pv.power_w(&DeviceContext::new(t)), 0.0, "step {t}");
        }
    }

    #[test]
    fn clear_sky_peaks_near_noon() {
        let pv = SolarPv::new(5000.0, 6, 18, 0.0, &day(), 42);
        let noon = pv.clear_sky_w(12);
        assert!(noon > 4900.0 && noon <= 5000.0);
        assert!(pv.clear_sky_w(8) < noon);
        assert_eq!(pv.clear_sky_w(36), noon);
    }

    #[test]
    fn without_noise_output_equals_clear_sky() {
        let mut pv = SolarPv::new(4000.0, 6, 18, 0.0, &day(), 1);
        for t in 0..24 {
            assert_eq!(pv.power_w(&DeviceContext::new(t)), pv.clear_sky_w(t));
        }
    }

    #[test]
    fn noisy_output_is_reproducible_and_non_negative() {
        let c = day();
        let mut a = SolarPv::new(5000.0, 6, 18, 0.5, &c, 7);
        let mut b = SolarPv::new(5000.0, 6, 18, 0.5, &c, 7);
        for t in 0..48 {
            let w = a.power_w(&DeviceContext::new(t));
            assert_eq!(w, b.power_w(&DeviceContext::new(t)));
            assert!(w >= 0.0);
        }
    }

    #[test]
    fn negative_inputs_are_clamped() {
        let pv = SolarPv::new(-1.0, 6, 18, -0.1, &day(), 42);
        assert_eq!(pv.peak_w, 0.0);
        assert_eq!(pv.noise_std, 0.0);
    }
}
