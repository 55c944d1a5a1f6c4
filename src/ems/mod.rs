//! Surplus-electricity energy management system.
//!
//! Every timestep the controller aggregates production and uncontrolled
//! consumption, hands the resulting surplus to tiered devices in ascending
//! priority-weight order, raises thermal-buffer setpoints while surplus is
//! left, and publishes the net grid exchange.

/// Aggregator over untiered and ems-controlled inputs.
pub mod aggregate;
/// Role rules and the sequential allocator.
pub mod allocate;
pub mod controller;
pub mod error;
/// Port handles, roles and tiers.
pub mod port;
pub mod registry;
/// Temperature setpoint modifier.
pub mod setpoint;
pub mod sorter;
pub mod state;
pub mod tie_group;

pub use controller::{AllocationStrategy, EmsConfig, EnergyManager, StepOutcome};
pub use error::EmsError;
pub use port::{DeviceRole, PortTag, PriorityPort, Signal, Tier, UNTIERED_WEIGHT};
pub use registry::{EmsOutputs, PortRegistry};
pub use setpoint::SetpointOffsets;
pub use state::{AllocationState, RoleLedger, SnapshotBuffer};
