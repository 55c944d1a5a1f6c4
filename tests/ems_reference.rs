//! End-to-end EMS behaviour on small hand-checked households.

mod common;

use ems_sim::ems::{
    AllocationStrategy, DeviceRole, EmsConfig, EmsError, EnergyManager, PriorityPort, Signal,
};

#[test]
fn reference_household_allocates_in_weight_order() {
    let r = common::reference_registry();
    let outputs = r.registry.outputs().clone();
    let mut ems = EnergyManager::new(EmsConfig::default(), r.registry);

    let outcome = ems.step(0).unwrap();

    assert_eq!(outcome.state.production_w, 5000.0);
    assert_eq!(outcome.state.consumption_uncontrolled_w, 1000.0);
    assert_eq!(outcome.state.initial_surplus_w(), 4000.0);
    assert_eq!(r.residents.read(), 2000.0);
    assert_eq!(r.heat_pump.read(), 500.0);
    assert_eq!(r.battery.read(), 500.0);
    assert_eq!(outcome.grid_balance_w(), 0.0);
    assert_eq!(outputs.grid_balance.read(), 0.0);
    assert_eq!(outputs.total_consumption.read(), 1000.0 + 2000.0 + 1500.0 + 500.0);
}

#[test]
fn ledger_accounts_for_every_watt_of_initial_surplus() {
    let r = common::reference_registry();
    let mut ems = EnergyManager::new(EmsConfig::default(), r.registry);
    let outcome = ems.step(0).unwrap();

    let initial = outcome.state.initial_surplus_w();
    assert_eq!(initial, outcome.grid_balance_w() + outcome.ledger.total_w());
    assert_eq!(outcome.ledger.get(DeviceRole::Residents), 2000.0);
    assert_eq!(outcome.ledger.get(DeviceRole::HeatPumpBuilding), 1500.0);
    assert_eq!(outcome.ledger.get(DeviceRole::Battery), 500.0);
}

#[test]
fn battery_using_exactly_its_offer_leaves_no_surplus() {
    let r = common::reference_registry();
    let mut ems = EnergyManager::new(EmsConfig::default(), r.registry);

    // The battery is offered 500 W; a partial draw leaves the rest for export.
    r.battery_demand.write(200.0);
    let partial = ems.step(0).unwrap();
    assert_eq!(r.battery.read(), 500.0);
    assert_eq!(partial.grid_balance_w(), 300.0);

    r.battery_demand.write(500.0);
    let exact = ems.step(1).unwrap();
    assert_eq!(exact.grid_balance_w(), 0.0);
}

#[test]
fn surplus_raises_heat_pump_offsets_and_deficit_clears_them() {
    let (registry, devices) = common::registry_with(
        4000.0,
        &[
            (DeviceRole::HeatPumpBuilding, 1, 1000.0),
            (DeviceRole::HeatPumpDhw, 2, 500.0),
        ],
    );
    let outputs = registry.outputs().clone();
    let mut ems = EnergyManager::new(EmsConfig::default(), registry);

    let outcome = ems.step(0).unwrap();
    assert!(outcome.setpoints_raised);
    assert_eq!(outputs.building_indoor_temperature_offset.read(), 2.0);
    assert_eq!(outputs.space_heating_storage_temperature_offset.read(), 10.0);
    assert_eq!(outputs.dhw_storage_temperature_offset.read(), 10.0);

    devices[0].demand.write(5000.0);
    let outcome = ems.step(1).unwrap();
    assert!(!outcome.setpoints_raised);
    assert_eq!(outputs.building_indoor_temperature_offset.read(), 0.0);
    assert_eq!(outputs.dhw_storage_temperature_offset.read(), 0.0);
}

#[test]
fn deficit_writes_negative_demand_regardless_of_order() {
    let demands = [(DeviceRole::Residents, 1, 800.0), (DeviceRole::CarBattery, 2, 3000.0)];
    let reversed = [demands[1], demands[0]];

    for devices in [&demands[..], &reversed[..]] {
        let (registry, consumers) = common::registry_with(0.0, devices);
        let mut ems = EnergyManager::new(EmsConfig::default(), registry);
        let outcome = ems.step(0).unwrap();

        for c in &consumers {
            assert_eq!(c.target.read(), -c.demand.read());
        }
        assert_eq!(outcome.grid_balance_w(), -3800.0);
    }
}

#[test]
fn chp_production_feeds_later_tiers() {
    let (registry, devices) = common::registry_with(
        0.0,
        &[
            (DeviceRole::Chp, 1, 1200.0),
            (DeviceRole::HeatPumpBuilding, 2, 700.0),
        ],
    );
    let mut ems = EnergyManager::new(EmsConfig::default(), registry);
    let outcome = ems.step(0).unwrap();

    assert_eq!(devices[0].target.read(), 1200.0);
    assert_eq!(devices[1].target.read(), 500.0);
    assert_eq!(outcome.grid_balance_w(), 500.0);
}

#[test]
fn peer_district_in_deficit_does_not_reduce_surplus() {
    let (registry, devices) = common::registry_with(
        500.0,
        &[
            (DeviceRole::Residents, 1, 1000.0),
            (DeviceRole::PeerDistrictController, 2, 2000.0),
        ],
    );
    let mut ems = EnergyManager::new(EmsConfig::default(), registry);
    let outcome = ems.step(0).unwrap();

    assert_eq!(devices[1].target.read(), -2000.0);
    assert_eq!(outcome.grid_balance_w(), -500.0);
}

#[test]
fn district_feed_counts_as_production_and_is_mirrored() {
    let r = common::reference_registry();
    let mut registry = r.registry;
    let feed = Signal::new(600.0);
    registry.set_district_feed(feed.clone());
    let outputs = registry.outputs().clone();
    let mut ems = EnergyManager::new(EmsConfig::default(), registry);

    let outcome = ems.step(0).unwrap();
    assert_eq!(outputs.district_feed_passthrough.read(), 600.0);
    assert_eq!(outcome.grid_balance_w(), 600.0);
}

#[test]
fn restore_then_rerun_reproduces_the_step() {
    let r = common::reference_registry();
    let outputs = r.registry.outputs().clone();
    let mut ems = EnergyManager::new(
        common::ems_config(AllocationStrategy::TieGroup),
        r.registry,
    );
    ems.step(0).unwrap();
    let before = ems.state();

    ems.save_state();
    let first = ems.step(1).unwrap();
    let first_targets = (r.residents.read(), r.heat_pump.read(), r.battery.read());
    let first_grid = outputs.grid_balance.read();

    ems.restore_state();
    assert_eq!(ems.state(), before);

    let second = ems.step(1).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first_targets,
        (r.residents.read(), r.heat_pump.read(), r.battery.read())
    );
    assert_eq!(first_grid, outputs.grid_balance.read());
}

#[test]
fn unmatched_target_is_a_configuration_error() {
    let (mut registry, _) = common::registry_with(1000.0, &[(DeviceRole::Residents, 1, 100.0)]);
    registry.add_input(
        "orphan",
        DeviceRole::HeatPumpDhw,
        ems_sim::ems::PortTag::ConsumptionEmsControlled,
        ems_sim::ems::Tier::Weighted(3),
        Signal::new(10.0),
    );
    let mut ems = EnergyManager::new(EmsConfig::default(), registry);

    let err = ems.prepare().unwrap_err();
    assert!(matches!(
        err,
        EmsError::Configuration {
            role: DeviceRole::HeatPumpDhw,
            weight: 3,
            ..
        }
    ));
}
