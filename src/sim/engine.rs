//! Simulation engine that drives the household models and the EMS.

use tracing::{debug, warn};

use crate::devices::{Device, DeviceContext};
use crate::ems::{EmsConfig, EmsError, EnergyManager, PriorityPort, StepOutcome};

use super::household::{Household, HouseholdPorts, PriorityWeights};
use super::types::{SimConfig, StepResult};

/// Readings closer than this are treated as unchanged between iterations (W).
const CONVERGENCE_TOLERANCE_W: f64 = 1e-6;

/// Simulation engine owning the household, its ports and the EMS.
///
/// Every timestep runs a bounded fixed-point iteration: the EMS and battery
/// state are saved, then devices respond to the current EMS signals and the
/// EMS reallocates until the responsive readings stop changing.
pub struct Engine {
    config: SimConfig,
    household: Household,
    ports: HouseholdPorts,
    ems: EnergyManager,
}

/// Readings that depend on EMS signals within a timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Responses {
    heat_pump_w: f64,
    dhw_w: f64,
    battery_w: f64,
}

impl Responses {
    fn settled(&self, previous: &Responses) -> bool {
        [
            (self.heat_pump_w, previous.heat_pump_w),
            (self.dhw_w, previous.dhw_w),
            (self.battery_w, previous.battery_w),
        ]
        .iter()
        .all(|(a, b)| (a - b).abs() <= CONVERGENCE_TOLERANCE_W)
    }
}

impl Engine {
    /// Wires `household` to a new EMS and builds its priority table.
    ///
    /// # Errors
    ///
    /// Returns [`EmsError::Configuration`] if the wiring is inconsistent.
    pub fn new(
        config: SimConfig,
        household: Household,
        weights: PriorityWeights,
        ems_config: EmsConfig,
    ) -> Result<Self, EmsError> {
        let ports = HouseholdPorts::default();
        let mut ems = EnergyManager::new(ems_config, ports.registry(&household, &weights));
        ems.prepare()?;
        debug!(devices = ?household.device_types(), "household wired");

        Ok(Self {
            config,
            household,
            ports,
            ems,
        })
    }

    /// Executes one simulation timestep.
    ///
    /// # Errors
    ///
    /// Propagates EMS allocation errors.
    pub fn step(&mut self, t: usize) -> Result<StepResult, EmsError> {
        let context = DeviceContext::new(t);
        let hh = &mut self.household;

        // Readings independent of EMS signals are sampled once per step.
        let pv_w = hh.pv.power_w(&context);
        let appliances_w = hh.appliances.power_w(&context);
        let residents_w = hh.residents.power_w(&context);
        let car_w = hh.car.as_mut().map_or(0.0, |car| car.power_w(&context));
        let district_feed_w = hh
            .district
            .map_or(0.0, |d| d.feed_w(t, self.config.steps_per_day));

        self.ports.pv.write(pv_w);
        self.ports.appliances.write(appliances_w);
        self.ports.residents.demand.write(residents_w);
        self.ports.car.demand.write(car_w);
        self.ports.district_feed.write(district_feed_w);

        self.ems.save_state();
        if let Some(battery) = self.household.battery.as_mut() {
            battery.save_state();
        }

        let max_iterations = self.config.max_iterations.max(2);
        let mut previous: Option<Responses> = None;
        let mut iterations = 0;
        let (outcome, responses, converged) = loop {
            iterations += 1;
            self.ems.restore_state();
            if let Some(battery) = self.household.battery.as_mut() {
                battery.restore_state();
            }

            let responses = self.respond(t);
            let outcome = self.ems.step(t)?;

            let settled = previous.is_some_and(|p| responses.settled(&p));
            if settled || iterations >= max_iterations {
                break (outcome, responses, settled);
            }
            previous = Some(responses);
        };

        if converged {
            debug!(timestep = t, iterations, "step converged");
        } else {
            warn!(
                timestep = t,
                iterations,
                heat_pump_w = responses.heat_pump_w,
                battery_w = responses.battery_w,
                "device readings did not settle within the iteration bound"
            );
        }

        Ok(self.record(
            t,
            StepInputs {
                pv_w,
                appliances_w,
                residents_w,
                car_w,
                district_feed_w,
            },
            responses,
            &outcome,
            iterations,
            converged,
        ))
    }

    /// Lets signal-driven devices react to the latest EMS outputs.
    fn respond(&mut self, t: usize) -> Responses {
        let outputs = &self.ports.outputs;
        let hh = &mut self.household;

        let heat_pump_w = hh.heat_pump.as_mut().map_or(0.0, |hp| {
            let offset = outputs.building_indoor_temperature_offset.read()
                + outputs.space_heating_storage_temperature_offset.read();
            hp.power_w(&DeviceContext::with_signal(t, offset))
        });
        let dhw_w = hh.dhw.as_mut().map_or(0.0, |dhw| {
            let offset = outputs.dhw_storage_temperature_offset.read();
            dhw.power_w(&DeviceContext::with_signal(t, offset))
        });
        let battery_w = hh.battery.as_mut().map_or(0.0, |battery| {
            let target = self.ports.battery.target.read();
            battery.power_w(&DeviceContext::with_signal(t, target))
        });

        self.ports.heat_pump.demand.write(heat_pump_w);
        self.ports.dhw.demand.write(dhw_w);
        self.ports.battery.demand.write(battery_w);

        Responses {
            heat_pump_w,
            dhw_w,
            battery_w,
        }
    }

    fn record(
        &self,
        t: usize,
        inputs: StepInputs,
        responses: Responses,
        outcome: &StepOutcome,
        iterations: usize,
        converged: bool,
    ) -> StepResult {
        let outputs = &self.ports.outputs;
        StepResult {
            timestep: t,
            time_hr: t as f64 * self.config.dt_hours,
            pv_w: inputs.pv_w,
            district_feed_w: inputs.district_feed_w,
            appliances_w: inputs.appliances_w,
            residents_w: inputs.residents_w,
            heat_pump_w: responses.heat_pump_w,
            dhw_w: responses.dhw_w,
            car_w: inputs.car_w,
            battery_target_w: self.ports.battery.target.read(),
            battery_w: responses.battery_w,
            battery_soc: self.household.battery.as_ref().map_or(0.0, |b| b.soc),
            grid_w: outcome.grid_balance_w(),
            total_consumption_w: outputs.total_consumption.read(),
            indoor_offset_c: outputs.building_indoor_temperature_offset.read(),
            space_heating_offset_c: outputs.space_heating_storage_temperature_offset.read(),
            dhw_offset_c: outputs.dhw_storage_temperature_offset.read(),
            iterations,
            converged,
            tie_rounds: outcome.tie_rounds,
        }
    }

    /// Executes all timesteps and returns the complete step record vector.
    ///
    /// # Errors
    ///
    /// Stops at the first EMS error.
    pub fn run(&mut self) -> Result<Vec<StepResult>, EmsError> {
        let total = self.config.total_steps();
        let mut results = Vec::with_capacity(total);
        for t in 0..total {
            results.push(self.step(t)?);
        }
        Ok(results)
    }

    pub fn household(&self) -> &Household {
        &self.household
    }

    pub fn ports(&self) -> &HouseholdPorts {
        &self.ports
    }

    pub fn ems(&self) -> &EnergyManager {
        &self.ems
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

/// Readings sampled once per timestep.
#[derive(Debug, Clone, Copy)]
struct StepInputs {
    pv_w: f64,
    appliances_w: f64,
    residents_w: f64,
    car_w: f64,
    district_feed_w: f64,
}
