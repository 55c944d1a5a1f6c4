//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::devices::{BaseLoad, Battery, EvCharger, HeatPump, HeatPumpKind, HeatPumpParams, SolarPv};
use crate::ems::{AllocationStrategy, EmsConfig, SetpointOffsets, UNTIERED_WEIGHT};
use crate::sim::household::{DistrictFeed, Household, PriorityWeights};
use crate::sim::types::SimConfig;

/// Seed offsets keep the random device models uncorrelated.
const APPLIANCES_SEED_OFFSET: u64 = 17;
const RESIDENTS_SEED_OFFSET: u64 = 31;
const CAR_SEED_OFFSET: u64 = 57;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections default to the baseline scenario. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or pick a built-in preset with
/// [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub simulation: SimulationConfig,
    pub ems: EmsSection,
    pub pv: PvConfig,
    pub residents: ResidentsConfig,
    pub appliances: AppliancesConfig,
    pub heat_pump: HeatPumpConfig,
    pub dhw: DhwConfig,
    pub battery: BatteryConfig,
    pub car: CarConfig,
    pub district: DistrictConfig,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of timesteps per simulated day (must be > 0).
    pub steps_per_day: usize,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Master random seed.
    pub seed: u64,
    /// Device/EMS iterations allowed per timestep (must be >= 2).
    pub max_iterations: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps_per_day: 24,
            days: 1,
            seed: 42,
            max_iterations: SimConfig::DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// EMS behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmsSection {
    /// `"sequential"` or `"tie-group"`.
    pub strategy: String,
    /// Temperature offsets applied while surplus is left (`[ems.offsets]`).
    pub offsets: SetpointOffsets,
    /// Peak-shaving limit (W); reported, not used for allocation.
    pub limit_to_shave_w: f64,
}

impl Default for EmsSection {
    fn default() -> Self {
        Self {
            strategy: AllocationStrategy::default().to_string(),
            offsets: SetpointOffsets::default(),
            limit_to_shave_w: 0.0,
        }
    }
}

/// Rooftop PV parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvConfig {
    /// Peak generation (W).
    pub peak_w: f64,
    /// Sunrise timestep index (inclusive).
    pub sunrise_idx: usize,
    /// Sunset timestep index (exclusive).
    pub sunset_idx: usize,
    /// Noise standard deviation as a fraction of output.
    pub noise_std: f64,
}

impl Default for PvConfig {
    fn default() -> Self {
        Self {
            peak_w: 5000.0,
            sunrise_idx: 6,
            sunset_idx: 18,
            noise_std: 0.05,
        }
    }
}

/// Residents' controllable load.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResidentsConfig {
    /// Priority weight; 999 counts the load as uncontrolled.
    pub weight: u32,
    pub base_w: f64,
    pub amp_w: f64,
    pub phase_rad: f64,
    pub noise_std_w: f64,
}

impl Default for ResidentsConfig {
    fn default() -> Self {
        Self {
            weight: 1,
            base_w: 400.0,
            amp_w: 250.0,
            phase_rad: 1.2,
            noise_std_w: 30.0,
        }
    }
}

/// Always-on appliance load, never allocated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppliancesConfig {
    pub base_w: f64,
    pub amp_w: f64,
    pub phase_rad: f64,
    pub noise_std_w: f64,
}

impl Default for AppliancesConfig {
    fn default() -> Self {
        Self {
            base_w: 250.0,
            amp_w: 100.0,
            phase_rad: 0.0,
            noise_std_w: 20.0,
        }
    }
}

/// Space heating heat pump.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeatPumpConfig {
    pub enabled: bool,
    pub weight: u32,
    pub rated_w: f64,
    pub cop: f64,
    /// Building heat loss coefficient (W/K).
    pub loss_w_per_k: f64,
    pub set_temperature_c: f64,
    pub outdoor_mean_c: f64,
    pub outdoor_swing_c: f64,
    /// Extra electrical demand per °C of indoor offset (W/K).
    pub boost_w_per_k: f64,
}

impl Default for HeatPumpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 2,
            rated_w: 3000.0,
            cop: 3.2,
            loss_w_per_k: 120.0,
            set_temperature_c: 20.0,
            outdoor_mean_c: 8.0,
            outdoor_swing_c: 8.0,
            boost_w_per_k: 150.0,
        }
    }
}

/// Domestic hot water heat pump.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DhwConfig {
    pub enabled: bool,
    pub weight: u32,
    pub rated_w: f64,
    pub cop: f64,
    /// Average hot water draw (thermal W).
    pub mean_draw_w: f64,
    /// Morning and evening peak height relative to the mean draw.
    pub peak_ratio: f64,
    /// Extra electrical demand per °C of storage offset (W/K).
    pub boost_w_per_k: f64,
}

impl Default for DhwConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 3,
            rated_w: 2000.0,
            cop: 2.6,
            mean_draw_w: 150.0,
            peak_ratio: 3.0,
            boost_w_per_k: 40.0,
        }
    }
}

/// Home battery parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    pub enabled: bool,
    pub weight: u32,
    /// Usable capacity (Wh).
    pub capacity_wh: f64,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f64,
    pub max_charge_w: f64,
    pub max_discharge_w: f64,
    /// Charge efficiency (0.0–1.0].
    pub eta_charge: f64,
    /// Discharge efficiency (0.0–1.0].
    pub eta_discharge: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 4,
            capacity_wh: 10_000.0,
            initial_soc: 0.5,
            max_charge_w: 5000.0,
            max_discharge_w: 5000.0,
            eta_charge: 0.95,
            eta_discharge: 0.95,
        }
    }
}

/// Car battery charging sessions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarConfig {
    pub enabled: bool,
    pub weight: u32,
    pub max_charge_w: f64,
    /// Minimum daily energy demand (Wh).
    pub demand_wh_min: f64,
    /// Maximum daily energy demand (Wh).
    pub demand_wh_max: f64,
    /// Minimum dwell duration (timesteps).
    pub dwell_steps_min: usize,
    /// Maximum dwell duration (timesteps).
    pub dwell_steps_max: usize,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 5,
            max_charge_w: 7200.0,
            demand_wh_min: 4000.0,
            demand_wh_max: 14_000.0,
            dwell_steps_min: 3,
            dwell_steps_max: 10,
        }
    }
}

/// Feed from an upstream district network.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistrictConfig {
    pub enabled: bool,
    pub feed_w: f64,
    pub start_step: usize,
    pub end_step: usize,
}

impl Default for DistrictConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            feed_w: 1000.0,
            start_step: 10,
            end_step: 14,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.steps_per_day"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a mild day with every device present.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the tie-group preset: a sunny day where the heat pumps and
    /// the car share one priority tier.
    pub fn tie_group() -> Self {
        Self {
            ems: EmsSection {
                strategy: AllocationStrategy::TieGroup.to_string(),
                ..EmsSection::default()
            },
            pv: PvConfig {
                peak_w: 9000.0,
                sunrise_idx: 5,
                sunset_idx: 20,
                ..PvConfig::default()
            },
            heat_pump: HeatPumpConfig {
                weight: 2,
                ..HeatPumpConfig::default()
            },
            dhw: DhwConfig {
                weight: 2,
                ..DhwConfig::default()
            },
            battery: BatteryConfig {
                weight: 3,
                ..BatteryConfig::default()
            },
            car: CarConfig {
                weight: 2,
                ..CarConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the winter preset: short days, cold weather and a district feed.
    pub fn winter() -> Self {
        Self {
            simulation: SimulationConfig {
                days: 2,
                ..SimulationConfig::default()
            },
            pv: PvConfig {
                peak_w: 3000.0,
                sunrise_idx: 8,
                sunset_idx: 16,
                ..PvConfig::default()
            },
            heat_pump: HeatPumpConfig {
                outdoor_mean_c: -2.0,
                outdoor_swing_c: 5.0,
                ..HeatPumpConfig::default()
            },
            dhw: DhwConfig {
                mean_draw_w: 200.0,
                ..DhwConfig::default()
            },
            district: DistrictConfig {
                enabled: true,
                feed_w: 1500.0,
                start_step: 11,
                end_step: 14,
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "tie_group", "winter"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "tie_group" => Ok(Self::tie_group()),
            "winter" => Ok(Self::winter()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError::new(field, message));
            }
        };

        let s = &self.simulation;
        check(s.steps_per_day > 0, "simulation.steps_per_day", "must be > 0");
        check(s.days > 0, "simulation.days", "must be > 0");
        check(
            s.max_iterations >= 2,
            "simulation.max_iterations",
            "must be >= 2 to detect convergence",
        );

        let ems = &self.ems;
        check(
            ems.strategy.parse::<AllocationStrategy>().is_ok(),
            "ems.strategy",
            &format!(
                "must be one of {}, got \"{}\"",
                AllocationStrategy::NAMES.join(", "),
                ems.strategy
            ),
        );
        let o = &ems.offsets;
        check(o.building_indoor_c >= 0.0, "ems.offsets.building_indoor_c", "must be >= 0");
        check(
            o.space_heating_storage_c >= 0.0,
            "ems.offsets.space_heating_storage_c",
            "must be >= 0",
        );
        check(o.dhw_storage_c >= 0.0, "ems.offsets.dhw_storage_c", "must be >= 0");
        check(ems.limit_to_shave_w >= 0.0, "ems.limit_to_shave_w", "must be >= 0");

        let pv = &self.pv;
        check(pv.peak_w >= 0.0, "pv.peak_w", "must be >= 0");
        check(pv.sunrise_idx < pv.sunset_idx, "pv.sunrise_idx", "must be < pv.sunset_idx");
        check(
            s.steps_per_day == 0 || pv.sunset_idx <= s.steps_per_day,
            "pv.sunset_idx",
            "must be <= simulation.steps_per_day",
        );

        check(self.residents.base_w >= 0.0, "residents.base_w", "must be >= 0");
        check(self.appliances.base_w >= 0.0, "appliances.base_w", "must be >= 0");

        let hp = &self.heat_pump;
        if hp.enabled {
            check(hp.cop > 0.0, "heat_pump.cop", "must be > 0");
            check(hp.rated_w >= 0.0, "heat_pump.rated_w", "must be >= 0");
            check(hp.loss_w_per_k >= 0.0, "heat_pump.loss_w_per_k", "must be >= 0");
        }

        let dhw = &self.dhw;
        if dhw.enabled {
            check(dhw.cop > 0.0, "dhw.cop", "must be > 0");
            check(dhw.rated_w >= 0.0, "dhw.rated_w", "must be >= 0");
            check(dhw.mean_draw_w >= 0.0, "dhw.mean_draw_w", "must be >= 0");
        }

        let bat = &self.battery;
        if bat.enabled {
            check(bat.capacity_wh > 0.0, "battery.capacity_wh", "must be > 0");
            check(
                (0.0..=1.0).contains(&bat.initial_soc),
                "battery.initial_soc",
                "must be in [0.0, 1.0]",
            );
            check(
                bat.max_charge_w >= 0.0 && bat.max_discharge_w >= 0.0,
                "battery.max_charge_w",
                "charge and discharge limits must be >= 0",
            );
            check(
                bat.eta_charge > 0.0 && bat.eta_charge <= 1.0,
                "battery.eta_charge",
                "must be in (0.0, 1.0]",
            );
            check(
                bat.eta_discharge > 0.0 && bat.eta_discharge <= 1.0,
                "battery.eta_discharge",
                "must be in (0.0, 1.0]",
            );
            check(
                bat.weight != UNTIERED_WEIGHT,
                "battery.weight",
                "a battery needs a priority tier to receive targets",
            );
        }

        let car = &self.car;
        if car.enabled {
            check(car.max_charge_w > 0.0, "car.max_charge_w", "must be > 0");
            check(
                car.demand_wh_min >= 0.0 && car.demand_wh_min <= car.demand_wh_max,
                "car.demand_wh_min",
                "must be >= 0 and <= car.demand_wh_max",
            );
            check(car.dwell_steps_min > 0, "car.dwell_steps_min", "must be > 0");
            check(
                car.dwell_steps_min <= car.dwell_steps_max,
                "car.dwell_steps_min",
                "must be <= car.dwell_steps_max",
            );
        }

        let d = &self.district;
        if d.enabled {
            check(d.feed_w >= 0.0, "district.feed_w", "must be >= 0");
            check(
                d.start_step < d.end_step,
                "district.start_step",
                "must be < district.end_step",
            );
        }

        errors
    }

    /// Timing parameters for the engine and devices.
    ///
    /// # Panics
    ///
    /// Panics if `steps_per_day` or `days` is zero; call
    /// [`validate`](Self::validate) first.
    pub fn sim_config(&self) -> SimConfig {
        let s = &self.simulation;
        SimConfig::new(s.steps_per_day, s.days, s.seed).with_max_iterations(s.max_iterations)
    }

    /// EMS runtime settings.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the strategy name is unknown.
    pub fn ems_config(&self) -> Result<EmsConfig, ConfigError> {
        let strategy = self
            .ems
            .strategy
            .parse::<AllocationStrategy>()
            .map_err(|e| ConfigError::new("ems.strategy", e.to_string()))?;
        Ok(EmsConfig {
            strategy,
            offsets: self.ems.offsets,
            limit_to_shave_w: self.ems.limit_to_shave_w,
        })
    }

    /// Priority weights of the controllable devices.
    pub fn weights(&self) -> PriorityWeights {
        PriorityWeights {
            residents: self.residents.weight,
            heat_pump: self.heat_pump.weight,
            dhw: self.dhw.weight,
            battery: self.battery.weight,
            car: self.car.weight,
        }
    }

    /// Instantiates every configured device model.
    ///
    /// # Panics
    ///
    /// Device constructors panic on values [`validate`](Self::validate) rejects.
    pub fn household(&self, sim: &SimConfig) -> Household {
        let seed = sim.seed;

        let pv = &self.pv;
        let app = &self.appliances;
        let res = &self.residents;
        let hp = &self.heat_pump;
        let dhw = &self.dhw;
        let bat = &self.battery;
        let car = &self.car;
        let d = &self.district;

        Household {
            pv: SolarPv::new(pv.peak_w, pv.sunrise_idx, pv.sunset_idx, pv.noise_std, sim, seed),
            appliances: BaseLoad::new(
                app.base_w,
                app.amp_w,
                app.phase_rad,
                app.noise_std_w,
                sim.steps_per_day,
                seed.wrapping_add(APPLIANCES_SEED_OFFSET),
            ),
            residents: BaseLoad::new(
                res.base_w,
                res.amp_w,
                res.phase_rad,
                res.noise_std_w,
                sim.steps_per_day,
                seed.wrapping_add(RESIDENTS_SEED_OFFSET),
            ),
            heat_pump: hp.enabled.then(|| {
                HeatPump::new(
                    HeatPumpKind::SpaceHeating,
                    HeatPumpParams {
                        rated_w: hp.rated_w,
                        cop: hp.cop,
                        thermal_w: hp.loss_w_per_k,
                        set_temperature_c: hp.set_temperature_c,
                        outdoor_mean_c: hp.outdoor_mean_c,
                        swing: hp.outdoor_swing_c,
                        boost_w_per_k: hp.boost_w_per_k,
                    },
                    sim,
                )
            }),
            dhw: dhw.enabled.then(|| {
                HeatPump::new(
                    HeatPumpKind::Dhw,
                    HeatPumpParams {
                        rated_w: dhw.rated_w,
                        cop: dhw.cop,
                        thermal_w: dhw.mean_draw_w,
                        set_temperature_c: 0.0,
                        outdoor_mean_c: 0.0,
                        swing: dhw.peak_ratio,
                        boost_w_per_k: dhw.boost_w_per_k,
                    },
                    sim,
                )
            }),
            battery: bat.enabled.then(|| {
                Battery::new(
                    bat.capacity_wh,
                    bat.initial_soc,
                    bat.max_charge_w,
                    bat.max_discharge_w,
                    bat.eta_charge,
                    bat.eta_discharge,
                    sim,
                )
            }),
            car: car.enabled.then(|| {
                EvCharger::new(
                    car.max_charge_w,
                    car.demand_wh_min,
                    car.demand_wh_max,
                    car.dwell_steps_min,
                    car.dwell_steps_max,
                    sim,
                    seed.wrapping_add(CAR_SEED_OFFSET),
                )
            }),
            district: d.enabled.then_some(DistrictFeed {
                feed_w: d.feed_w,
                start_step: d.start_step,
                end_step: d.end_step,
            }),
        }
    }
}
