//! Aggregator: sums untiered and ems-controlled readings into the initial state.

use super::port::PriorityPort;
use super::registry::PortRegistry;
use super::sorter::PriorityTable;
use super::state::AllocationState;

/// Builds the timestep's aggregate state from current port readings.
///
/// `district_feed_w` is power arriving from an upstream network that was not
/// consumed there; it counts as production. The returned `surplus_w` is the
/// initial surplus, `production_w - consumption_uncontrolled_w`.
pub fn aggregate<P: PriorityPort>(
    registry: &PortRegistry<P>,
    table: &PriorityTable,
    district_feed_w: f64,
) -> AllocationState {
    let sum = |indices: &[usize]| -> f64 {
        indices
            .iter()
            .map(|&i| registry.input(i).port.read())
            .sum()
    };

    let production_w = sum(table.production()) + district_feed_w;
    let consumption_uncontrolled_w = sum(table.uncontrolled());
    let consumption_ems_controlled_w = sum(table.ems_controlled());

    AllocationState {
        production_w,
        consumption_uncontrolled_w,
        consumption_ems_controlled_w,
        surplus_w: production_w - consumption_uncontrolled_w,
    }
}
