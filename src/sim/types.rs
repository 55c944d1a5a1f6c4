//! Core simulation types: timing configuration and per-step records.

use std::fmt;

use serde::Serialize;

/// Centralized simulation configuration.
///
/// All devices and the engine reference this struct for timing parameters.
///
/// # Examples
///
/// ```
/// use ems_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(24, 1, 42);
/// assert_eq!(cfg.dt_hours, 1.0);
/// assert_eq!(cfg.total_steps(), 24);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of simulation steps per day.
    pub steps_per_day: usize,
    /// Number of days to simulate.
    pub days: usize,
    /// Duration of one timestep in hours, derived as `24.0 / steps_per_day`.
    pub dt_hours: f64,
    /// Master random seed for reproducibility.
    pub seed: u64,
    /// Upper bound on device/EMS iterations within one timestep.
    pub max_iterations: usize,
}

impl SimConfig {
    pub const DEFAULT_MAX_ITERATIONS: usize = 8;

    /// Creates a new simulation configuration.
    ///
    /// # Panics
    ///
    /// Panics if `steps_per_day` or `days` is zero.
    pub fn new(steps_per_day: usize, days: usize, seed: u64) -> Self {
        assert!(steps_per_day > 0, "steps_per_day must be > 0");
        assert!(days > 0, "days must be > 0");
        Self {
            steps_per_day,
            days,
            dt_hours: 24.0 / steps_per_day as f64,
            seed,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Replaces the iteration bound; values below 2 are raised to 2.
    ///
    /// A step settles once two consecutive iterations agree.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(2);
        self
    }

    /// Total number of simulation steps across all days.
    pub fn total_steps(&self) -> usize {
        self.steps_per_day * self.days
    }
}

/// Complete record of one simulated timestep.
///
/// Powers are in watts. `grid_w` is the EMS grid balance: positive values
/// are exported, negative values imported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub timestep: usize,
    /// Simulation time in hours.
    pub time_hr: f64,
    pub pv_w: f64,
    pub district_feed_w: f64,
    pub appliances_w: f64,
    pub residents_w: f64,
    pub heat_pump_w: f64,
    pub dhw_w: f64,
    pub car_w: f64,
    /// Target the EMS wrote for the battery.
    pub battery_target_w: f64,
    /// Power the battery actually exchanged (positive = charging).
    pub battery_w: f64,
    pub battery_soc: f64,
    pub grid_w: f64,
    pub total_consumption_w: f64,
    pub indoor_offset_c: f64,
    pub space_heating_offset_c: f64,
    pub dhw_offset_c: f64,
    /// Device/EMS iterations used in this timestep.
    pub iterations: usize,
    /// Whether device readings settled before the iteration bound.
    pub converged: bool,
    /// Most rounds any tie group needed.
    pub tie_rounds: usize,
}

impl StepResult {
    /// Grid import (W, non-negative).
    pub fn import_w(&self) -> f64 {
        (-self.grid_w).max(0.0)
    }

    /// Grid export (W, non-negative).
    pub fn export_w(&self) -> f64 {
        self.grid_w.max(0.0)
    }

    /// Whether any temperature offset was raised.
    pub fn setpoints_raised(&self) -> bool {
        self.indoor_offset_c > 0.0 || self.space_heating_offset_c > 0.0 || self.dhw_offset_c > 0.0
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>3} ({:>5.1}h) | grid={:>8.1} W | pv={:.0}  res={:.0}  app={:.0}  \
             hp={:.0}  dhw={:.0}  car={:.0}  bat={:.0} (SoC={:.1}%) | \
             offsets=({:.1}, {:.1}, {:.1}) °C | iter={}{}",
            self.timestep,
            self.time_hr,
            self.grid_w,
            self.pv_w,
            self.residents_w,
            self.appliances_w,
            self.heat_pump_w,
            self.dhw_w,
            self.car_w,
            self.battery_w,
            self.battery_soc * 100.0,
            self.indoor_offset_c,
            self.space_heating_offset_c,
            self.dhw_offset_c,
            self.iterations,
            if self.converged { "" } else { " (not converged)" },
        )
    }
}
