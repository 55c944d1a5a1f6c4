//! Household surplus-electricity energy management simulator.

/// TOML scenario configuration and presets.
pub mod config;
pub mod devices;
/// Surplus allocation controller.
pub mod ems;
pub mod io;
/// Simulation engine, household wiring and KPIs.
pub mod sim;
