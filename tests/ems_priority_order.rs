//! Port access order observed through recording ports.

mod common;

use common::{Access, AccessLog};
use ems_sim::ems::{
    AllocationStrategy, DeviceRole, EnergyManager, PortRegistry, PriorityPort, Tier,
};

fn target_writes(log: &[Access]) -> Vec<&'static str> {
    log.iter()
        .filter_map(|a| match a {
            Access::Write(name, _) if name.ends_with(".target") => Some(*name),
            _ => None,
        })
        .collect()
}

fn reversed_household(log: &AccessLog) -> PortRegistry<common::RecordingPort> {
    let mut registry = PortRegistry::new(log.outputs());
    registry
        .add_production("pv", DeviceRole::Pv, log.port("pv", 6000.0))
        .add_uncontrolled("appliances", DeviceRole::Appliances, log.port("appliances", 500.0))
        .add_device(
            "car",
            DeviceRole::CarBattery,
            Tier::Weighted(5),
            log.port("car.demand", 3000.0),
            log.port("car.target", 0.0),
        )
        .add_device(
            "battery",
            DeviceRole::Battery,
            Tier::Weighted(4),
            log.port("battery.demand", 1000.0),
            log.port("battery.target", 0.0),
        )
        .add_device(
            "heat_pump",
            DeviceRole::HeatPumpBuilding,
            Tier::Weighted(2),
            log.port("heat_pump.demand", 1200.0),
            log.port("heat_pump.target", 0.0),
        )
        .add_device(
            "residents",
            DeviceRole::Residents,
            Tier::Weighted(1),
            log.port("residents.demand", 800.0),
            log.port("residents.target", 0.0),
        );
    registry
}

#[test]
fn devices_are_served_in_weight_order_not_registration_order() {
    let log = AccessLog::default();
    let mut ems = EnergyManager::new(
        common::ems_config(AllocationStrategy::Sequential),
        reversed_household(&log),
    );
    ems.prepare().unwrap();
    log.take();

    ems.step(0).unwrap();
    let accesses = log.take();

    assert_eq!(
        target_writes(&accesses),
        [
            "residents.target",
            "heat_pump.target",
            "battery.target",
            "car.target"
        ]
    );
}

#[test]
fn each_device_is_read_right_before_its_target_is_written() {
    let log = AccessLog::default();
    let mut ems = EnergyManager::new(
        common::ems_config(AllocationStrategy::Sequential),
        reversed_household(&log),
    );
    ems.step(0).unwrap();
    let accesses = log.take();

    let pos = |needle: &Access| accesses.iter().rposition(|a| a == needle).unwrap();
    let residents_read = pos(&Access::Read("residents.demand"));
    let car_read = pos(&Access::Read("car.demand"));

    assert!(matches!(
        accesses[residents_read + 1],
        Access::Write("residents.target", _)
    ));
    assert!(matches!(accesses[car_read + 1], Access::Write("car.target", _)));
}

#[test]
fn grid_balance_and_total_consumption_are_written_last() {
    let log = AccessLog::default();
    let mut ems = EnergyManager::new(
        common::ems_config(AllocationStrategy::Sequential),
        reversed_household(&log),
    );
    ems.step(0).unwrap();
    let accesses = log.take();

    // 6000 - 500 - 800 - 1200 - 1000 - 3000 = -500
    let n = accesses.len();
    assert_eq!(accesses[n - 2], Access::Write("grid_balance", -500.0));
    assert_eq!(accesses[n - 1], Access::Write("total_consumption", 6500.0));
}

#[test]
fn district_feed_is_read_and_mirrored_before_aggregation() {
    let log = AccessLog::default();
    let mut registry = reversed_household(&log);
    registry.set_district_feed(log.port("district_feed", 700.0));
    let mut ems = EnergyManager::new(
        common::ems_config(AllocationStrategy::Sequential),
        registry,
    );
    ems.step(0).unwrap();
    let accesses = log.take();

    assert_eq!(accesses[0], Access::Read("district_feed"));
    assert_eq!(
        accesses[1],
        Access::Write("district_feed_passthrough", 700.0)
    );
    assert_eq!(accesses[2], Access::Read("pv"));
}

#[test]
fn tie_group_members_are_written_after_the_whole_group_is_read() {
    let log = AccessLog::default();
    let mut registry = PortRegistry::new(log.outputs());
    registry
        .add_production("pv", DeviceRole::Pv, log.port("pv", 3000.0))
        .add_device(
            "heat_pump",
            DeviceRole::HeatPumpBuilding,
            Tier::Weighted(2),
            log.port("heat_pump.demand", 500.0),
            log.port("heat_pump.target", 0.0),
        )
        .add_device(
            "car",
            DeviceRole::CarBattery,
            Tier::Weighted(2),
            log.port("car.demand", 2000.0),
            log.port("car.target", 0.0),
        );
    let mut ems = EnergyManager::new(common::ems_config(AllocationStrategy::TieGroup), registry);
    ems.step(0).unwrap();
    let accesses = log.take();

    let last_read = accesses
        .iter()
        .rposition(|a| *a == Access::Read("car.demand"))
        .unwrap();
    let first_write = accesses
        .iter()
        .position(|a| matches!(a, Access::Write(name, _) if name.ends_with(".target")))
        .unwrap();
    assert!(last_read < first_write);
    // Registration order within the group.
    assert_eq!(target_writes(&accesses), ["heat_pump.target", "car.target"]);
}

#[test]
fn recording_port_values_match_signal_semantics() {
    let log = AccessLog::default();
    let port = log.port("meter", 1.5);
    port.write(2.5);
    assert_eq!(port.read(), 2.5);
    assert_eq!(
        log.take(),
        [Access::Write("meter", 2.5), Access::Read("meter")]
    );
}
