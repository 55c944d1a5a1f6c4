//! The simulated household and its wiring to the EMS ports.

use crate::devices::{BaseLoad, Battery, Device, EvCharger, HeatPump, SolarPv};
use crate::ems::{DeviceRole, EmsOutputs, PortRegistry, Signal, Tier};

/// Priority weights of the controllable devices (lower = served first).
///
/// [`UNTIERED_WEIGHT`](crate::ems::UNTIERED_WEIGHT) keeps a device out of
/// allocation; its demand is then counted as uncontrolled consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityWeights {
    pub residents: u32,
    pub heat_pump: u32,
    pub dhw: u32,
    pub battery: u32,
    pub car: u32,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            residents: 1,
            heat_pump: 2,
            dhw: 3,
            battery: 4,
            car: 5,
        }
    }
}

/// Constant feed from an upstream district network during a daily window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistrictFeed {
    pub feed_w: f64,
    /// First step of the daily window (inclusive).
    pub start_step: usize,
    /// Last step of the daily window (exclusive).
    pub end_step: usize,
}

impl DistrictFeed {
    /// Feed at `timestep` (W).
    pub fn feed_w(&self, timestep: usize, steps_per_day: usize) -> f64 {
        let day_t = timestep % steps_per_day.max(1);
        if (self.start_step..self.end_step).contains(&day_t) {
            self.feed_w
        } else {
            0.0
        }
    }
}

/// Every device model of one household.
#[derive(Debug, Clone)]
pub struct Household {
    pub pv: SolarPv,
    pub appliances: BaseLoad,
    pub residents: BaseLoad,
    pub heat_pump: Option<HeatPump>,
    pub dhw: Option<HeatPump>,
    pub battery: Option<Battery>,
    pub car: Option<EvCharger>,
    pub district: Option<DistrictFeed>,
}

impl Household {
    /// Type names of the present device models, production first.
    pub fn device_types(&self) -> Vec<&'static str> {
        let mut types = vec![
            self.pv.device_type(),
            self.appliances.device_type(),
            self.residents.device_type(),
        ];
        let optional: [Option<&dyn Device>; 4] = [
            self.heat_pump.as_ref().map(|d| d as &dyn Device),
            self.dhw.as_ref().map(|d| d as &dyn Device),
            self.battery.as_ref().map(|d| d as &dyn Device),
            self.car.as_ref().map(|d| d as &dyn Device),
        ];
        types.extend(optional.into_iter().flatten().map(|d| d.device_type()));
        types
    }
}

/// A demand input with its target output.
#[derive(Debug, Clone, Default)]
pub struct DevicePorts {
    pub demand: Signal,
    pub target: Signal,
}

/// Signals shared between the household models and the EMS.
#[derive(Debug, Clone, Default)]
pub struct HouseholdPorts {
    pub pv: Signal,
    pub appliances: Signal,
    pub district_feed: Signal,
    pub residents: DevicePorts,
    pub heat_pump: DevicePorts,
    pub dhw: DevicePorts,
    pub battery: DevicePorts,
    pub car: DevicePorts,
    pub outputs: EmsOutputs<Signal>,
}

impl HouseholdPorts {
    /// Registers every present device with the EMS.
    pub fn registry(&self, household: &Household, weights: &PriorityWeights) -> PortRegistry {
        let mut reg = PortRegistry::new(self.outputs.clone());
        reg.add_production("pv", DeviceRole::Pv, self.pv.clone())
            .add_uncontrolled("appliances", DeviceRole::Appliances, self.appliances.clone());

        connect(&mut reg, "residents", DeviceRole::Residents, weights.residents, &self.residents);
        if household.heat_pump.is_some() {
            connect(
                &mut reg,
                "heat_pump",
                DeviceRole::HeatPumpBuilding,
                weights.heat_pump,
                &self.heat_pump,
            );
        }
        if household.dhw.is_some() {
            connect(&mut reg, "dhw", DeviceRole::HeatPumpDhw, weights.dhw, &self.dhw);
        }
        if household.battery.is_some() {
            connect(&mut reg, "battery", DeviceRole::Battery, weights.battery, &self.battery);
        }
        if household.car.is_some() {
            connect(&mut reg, "car", DeviceRole::CarBattery, weights.car, &self.car);
        }
        if household.district.is_some() {
            reg.set_district_feed(self.district_feed.clone());
        }
        reg
    }
}

fn connect(
    reg: &mut PortRegistry,
    name: &str,
    role: DeviceRole,
    weight: u32,
    ports: &DevicePorts,
) {
    match Tier::from_weight(weight) {
        Tier::Untiered => {
            reg.add_uncontrolled(name, role, ports.demand.clone());
        }
        tier => {
            reg.add_device(name, role, tier, ports.demand.clone(), ports.target.clone());
        }
    }
}
