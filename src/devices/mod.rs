//! Household device models connected to the EMS.

/// Sinusoidal consumption profile (residents, appliances).
pub mod baseload;
/// Home battery following the EMS target.
pub mod battery;
/// Car battery charging sessions.
pub mod ev_charger;
/// Space heating and domestic hot water heat pumps.
pub mod heat_pump;
/// Rooftop PV generation.
pub mod solar;
pub mod types;

pub use baseload::BaseLoad;
pub use battery::Battery;
pub use ev_charger::EvCharger;
pub use heat_pump::{HeatPump, HeatPumpKind, HeatPumpParams};
pub use solar::SolarPv;
pub use types::Device;
pub use types::DeviceContext;
