//! Typed port handles, device roles, and tier tags.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Weight that configuration files use to mark an untiered port.
pub const UNTIERED_WEIGHT: u32 = 999;

/// Device role attached to a port.
///
/// The role decides which signed-arithmetic rule the allocator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    /// Photovoltaic production (untiered aggregate only).
    Pv,
    /// Non-controllable household appliances (untiered aggregate only).
    Appliances,
    Residents,
    Electrolyzer,
    SmartDevice,
    CarBattery,
    HeatPump,
    HeatPumpDhw,
    HeatPumpBuilding,
    Battery,
    Chp,
    PeerDistrictController,
}

impl DeviceRole {
    /// Number of variants, used to size role-keyed arrays.
    pub const COUNT: usize = 12;

    /// Every role in declaration order.
    pub const ALL: [DeviceRole; Self::COUNT] = [
        DeviceRole::Pv,
        DeviceRole::Appliances,
        DeviceRole::Residents,
        DeviceRole::Electrolyzer,
        DeviceRole::SmartDevice,
        DeviceRole::CarBattery,
        DeviceRole::HeatPump,
        DeviceRole::HeatPumpDhw,
        DeviceRole::HeatPumpBuilding,
        DeviceRole::Battery,
        DeviceRole::Chp,
        DeviceRole::PeerDistrictController,
    ];

    /// Dense index of this role, in `0..COUNT`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for roles that draw power and can be covered onsite.
    pub fn is_consumer(self) -> bool {
        matches!(
            self,
            DeviceRole::Residents
                | DeviceRole::Electrolyzer
                | DeviceRole::SmartDevice
                | DeviceRole::CarBattery
                | DeviceRole::HeatPump
                | DeviceRole::HeatPumpDhw
                | DeviceRole::HeatPumpBuilding
        )
    }

    /// Human-readable role name.
    pub fn name(self) -> &'static str {
        match self {
            DeviceRole::Pv => "PV",
            DeviceRole::Appliances => "Appliances",
            DeviceRole::Residents => "Residents",
            DeviceRole::Electrolyzer => "Electrolyzer",
            DeviceRole::SmartDevice => "SmartDevice",
            DeviceRole::CarBattery => "CarBattery",
            DeviceRole::HeatPump => "HeatPump",
            DeviceRole::HeatPumpDhw => "HeatPumpDHW",
            DeviceRole::HeatPumpBuilding => "HeatPumpBuilding",
            DeviceRole::Battery => "Battery",
            DeviceRole::Chp => "CHP",
            DeviceRole::PeerDistrictController => "PeerDistrict",
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortTag {
    /// Feeds `production_w`.
    Production,
    /// Feeds `consumption_uncontrolled_w`.
    ConsumptionUncontrolled,
    /// Demand reading of a device negotiated by the EMS.
    ConsumptionEmsControlled,
    /// Allocation decision written back to a device.
    ElectricityTarget,
}

/// Priority tier of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Always aggregated, never sequenced.
    Untiered,
    /// Served in ascending weight order.
    Weighted(u32),
}

impl Tier {
    /// Maps a configured weight onto a tier, treating [`UNTIERED_WEIGHT`] as untiered.
    pub fn from_weight(weight: u32) -> Self {
        if weight == UNTIERED_WEIGHT {
            Tier::Untiered
        } else {
            Tier::Weighted(weight)
        }
    }

    /// Returns the weight of a weighted tier.
    pub fn weight(self) -> Option<u32> {
        match self {
            Tier::Untiered => None,
            Tier::Weighted(w) => Some(w),
        }
    }
}

/// Per-timestep scalar connection between the EMS and a device model.
///
/// Input ports are only read by the EMS, output ports only written.
pub trait PriorityPort {
    /// Reads the current timestep value in watts.
    fn read(&self) -> f64;

    /// Overwrites the current timestep value.
    fn write(&self, value: f64);
}

/// Shared single-threaded signal cell.
///
/// Cloning yields a second handle to the same value, so a device model and
/// the EMS can hold the two ends of one connection.
#[derive(Debug, Clone, Default)]
pub struct Signal(Rc<Cell<f64>>);

impl Signal {
    /// Creates a new signal holding `value`.
    pub fn new(value: f64) -> Self {
        Self(Rc::new(Cell::new(value)))
    }

    /// Returns `true` when both handles point at the same cell.
    pub fn same_as(&self, other: &Signal) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PriorityPort for Signal {
    fn read(&self) -> f64 {
        self.0.get()
    }

    fn write(&self, value: f64) {
        self.0.set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untiered_weight_maps_to_untiered() {
        assert_eq!(Tier::from_weight(999), Tier::Untiered);
        assert_eq!(Tier::from_weight(3), Tier::Weighted(3));
        assert_eq!(Tier::Weighted(3).weight(), Some(3));
        assert_eq!(Tier::Untiered.weight(), None);
    }

    #[test]
    fn signal_clones_share_value() {
        let a = Signal::new(1.0);
        let b = a.clone();
        b.write(42.0);
        assert_eq!(a.read(), 42.0);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&Signal::default()));
    }

    #[test]
    fn role_indices_are_dense() {
        for (i, role) in DeviceRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }

    #[test]
    fn consumer_roles() {
        assert!(DeviceRole::Residents.is_consumer());
        assert!(DeviceRole::HeatPumpBuilding.is_consumer());
        assert!(!DeviceRole::Battery.is_consumer());
        assert!(!DeviceRole::Chp.is_consumer());
        assert!(!DeviceRole::PeerDistrictController.is_consumer());
    }
}
