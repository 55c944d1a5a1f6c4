//! Common types and traits for household device models.

use rand::{Rng, rngs::StdRng};

/// Contextual information passed to devices during power calculations.
///
/// `signal` carries whatever the EMS last wrote for the device: a power
/// target in watts for batteries, a temperature offset in °C for heat pumps.
#[derive(Debug, Clone, Copy)]
pub struct DeviceContext {
    pub timestep: usize,
    pub signal: Option<f64>,
}

impl DeviceContext {
    /// Creates a context with no EMS signal.
    pub fn new(timestep: usize) -> Self {
        Self {
            timestep,
            signal: None,
        }
    }

    /// Creates a context carrying an EMS signal.
    pub fn with_signal(timestep: usize, signal: f64) -> Self {
        Self {
            timestep,
            signal: Some(signal),
        }
    }
}

/// A household device that produces or consumes electricity.
pub trait Device {
    /// Returns the electrical power at the context's timestep (W).
    ///
    /// Producers return positive generation, consumers positive demand. A
    /// battery returns its charging power; discharging is negative.
    fn power_w(&mut self, context: &DeviceContext) -> f64;

    /// Returns a human-readable type name for the device.
    fn device_type(&self) -> &'static str;
}

/// Gaussian noise with mean 0 via the Box-Muller transform.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Half-sine daylight fraction in `[0, 1]` for step `t`.
///
/// Zero outside `[sunrise_idx, sunset_idx)`, peaking at solar noon.
pub fn daylight_frac(t: usize, steps_per_day: usize, sunrise_idx: usize, sunset_idx: usize) -> f64 {
    let day_t = t % steps_per_day.max(1);
    if day_t < sunrise_idx || day_t >= sunset_idx {
        return 0.0;
    }
    let span = (sunset_idx - sunrise_idx) as f64;
    let x = (day_t - sunrise_idx) as f64 + 0.5;
    (std::f64::consts::PI * x / span).sin().max(0.0)
}

/// Position within the day in `[0, 1)`.
pub fn day_position(t: usize, steps_per_day: usize) -> f64 {
    let spd = steps_per_day.max(1);
    (t % spd) as f64 / spd as f64
}
