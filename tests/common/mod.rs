//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ems_sim::config::ScenarioConfig;
use ems_sim::ems::{DeviceRole, EmsConfig, EmsOutputs, PortRegistry, PriorityPort, Signal, Tier};
use ems_sim::sim::engine::Engine;

/// Engine for a preset with its own configured timing.
pub fn preset_engine(name: &str) -> Engine {
    let scenario = ScenarioConfig::from_preset(name).unwrap();
    let sim = scenario.sim_config();
    let household = scenario.household(&sim);
    Engine::new(sim, household, scenario.weights(), scenario.ems_config().unwrap()).unwrap()
}

/// Ports of the reference household used across EMS tests.
pub struct Reference {
    pub registry: PortRegistry,
    pub residents: Signal,
    pub heat_pump: Signal,
    pub battery_demand: Signal,
    pub battery: Signal,
}

/// 5000 W production, 1000 W uncontrolled load, residents 2000 W (weight 1),
/// heat pump 1500 W (weight 2) and a battery using 500 W (weight 3).
pub fn reference_registry() -> Reference {
    let residents = Signal::default();
    let heat_pump = Signal::default();
    let battery_demand = Signal::new(500.0);
    let battery = Signal::default();

    let mut registry: PortRegistry = PortRegistry::default();
    registry
        .add_production("pv", DeviceRole::Pv, Signal::new(5000.0))
        .add_uncontrolled("appliances", DeviceRole::Appliances, Signal::new(1000.0))
        .add_device(
            "residents",
            DeviceRole::Residents,
            Tier::Weighted(1),
            Signal::new(2000.0),
            residents.clone(),
        )
        .add_device(
            "heat_pump",
            DeviceRole::HeatPumpBuilding,
            Tier::Weighted(2),
            Signal::new(1500.0),
            heat_pump.clone(),
        )
        .add_device(
            "battery",
            DeviceRole::Battery,
            Tier::Weighted(3),
            battery_demand.clone(),
            battery.clone(),
        );

    Reference {
        registry,
        residents,
        heat_pump,
        battery_demand,
        battery,
    }
}

/// Consumer registered with a demand and a target signal.
pub struct Consumer {
    pub demand: Signal,
    pub target: Signal,
}

/// Registry with one production input and the given tiered devices.
pub fn registry_with(
    production_w: f64,
    devices: &[(DeviceRole, u32, f64)],
) -> (PortRegistry, Vec<Consumer>) {
    let mut registry: PortRegistry = PortRegistry::default();
    registry.add_production("pv", DeviceRole::Pv, Signal::new(production_w));
    let mut consumers = Vec::with_capacity(devices.len());
    for (i, (role, weight, demand)) in devices.iter().enumerate() {
        let c = Consumer {
            demand: Signal::new(*demand),
            target: Signal::default(),
        };
        registry.add_device(
            format!("{role}-{i}"),
            *role,
            Tier::from_weight(*weight),
            c.demand.clone(),
            c.target.clone(),
        );
        consumers.push(c);
    }
    (registry, consumers)
}

pub fn ems_config(strategy: ems_sim::ems::AllocationStrategy) -> EmsConfig {
    EmsConfig {
        strategy,
        ..EmsConfig::default()
    }
}

/// One observed port access.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Read(&'static str),
    Write(&'static str, f64),
}

/// Port that appends every access to a shared log.
#[derive(Debug, Clone)]
pub struct RecordingPort {
    name: &'static str,
    value: Rc<Cell<f64>>,
    log: Rc<RefCell<Vec<Access>>>,
}

impl PriorityPort for RecordingPort {
    fn read(&self) -> f64 {
        self.log.borrow_mut().push(Access::Read(self.name));
        self.value.get()
    }

    fn write(&self, value: f64) {
        self.log.borrow_mut().push(Access::Write(self.name, value));
        self.value.set(value);
    }
}

/// Factory for [`RecordingPort`]s sharing one log.
#[derive(Debug, Clone, Default)]
pub struct AccessLog(Rc<RefCell<Vec<Access>>>);

impl AccessLog {
    pub fn port(&self, name: &'static str, value: f64) -> RecordingPort {
        RecordingPort {
            name,
            value: Rc::new(Cell::new(value)),
            log: Rc::clone(&self.0),
        }
    }

    /// EMS outputs whose writes are logged under their field names.
    pub fn outputs(&self) -> EmsOutputs<RecordingPort> {
        EmsOutputs {
            grid_balance: self.port("grid_balance", 0.0),
            total_consumption: self.port("total_consumption", 0.0),
            building_indoor_temperature_offset: self.port("indoor_offset", 0.0),
            space_heating_storage_temperature_offset: self.port("space_heating_offset", 0.0),
            dhw_storage_temperature_offset: self.port("dhw_offset", 0.0),
            district_feed_passthrough: self.port("district_feed_passthrough", 0.0),
        }
    }

    pub fn take(&self) -> Vec<Access> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}
