pub mod engine;
/// Household device set and its EMS wiring.
pub mod household;
pub mod kpi;
pub mod types;
