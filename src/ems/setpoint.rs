//! Setpoint modifier: raises thermal-buffer targets while surplus is left.

use serde::{Deserialize, Serialize};

use super::port::{DeviceRole, PriorityPort};
use super::registry::EmsOutputs;
use super::sorter::TierEntry;

/// Temperature offsets applied while surplus electricity is available (°C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetpointOffsets {
    /// Building indoor set temperature increase. Must stay below the gap
    /// between the heating and cooling set temperatures.
    pub building_indoor_c: f64,
    /// Space-heating water storage set temperature increase.
    pub space_heating_storage_c: f64,
    /// Domestic hot water storage set temperature increase.
    pub dhw_storage_c: f64,
}

impl Default for SetpointOffsets {
    fn default() -> Self {
        Self {
            building_indoor_c: 2.0,
            space_heating_storage_c: 10.0,
            dhw_storage_c: 10.0,
        }
    }
}

/// Writes temperature offsets for every heat pump in `entries`.
///
/// Space-heating heat pumps get the indoor and storage offsets, DHW heat
/// pumps the hot water offset; both fall back to zero without surplus.
/// Returns `true` if any positive offset was written.
pub fn apply_setpoints<P: PriorityPort>(
    entries: &[TierEntry],
    final_surplus_w: f64,
    offsets: &SetpointOffsets,
    outputs: &EmsOutputs<P>,
) -> bool {
    let surplus = final_surplus_w > 0.0;
    let mut raised = false;

    for entry in entries {
        match entry.role {
            DeviceRole::HeatPumpBuilding => {
                let (indoor, storage) = if surplus {
                    (offsets.building_indoor_c, offsets.space_heating_storage_c)
                } else {
                    (0.0, 0.0)
                };
                outputs.building_indoor_temperature_offset.write(indoor);
                outputs.space_heating_storage_temperature_offset.write(storage);
                raised |= surplus;
            }
            DeviceRole::HeatPumpDhw | DeviceRole::HeatPump => {
                let dhw = if surplus { offsets.dhw_storage_c } else { 0.0 };
                outputs.dhw_storage_temperature_offset.write(dhw);
                raised |= surplus;
            }
            _ => {}
        }
    }

    raised
}
