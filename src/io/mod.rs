/// CSV telemetry and JSON summary writers.
pub mod export;
