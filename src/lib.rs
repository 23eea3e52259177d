//! Solar farm telemetry simulator.

#[cfg(feature = "api")]
pub mod api;
pub mod cli;
pub mod config;
pub mod runner;
/// Physical model, anomalies, farm state and the cycle engine.
pub mod sim;
/// Publication of measurements.
pub mod sink;
pub mod telemetry;
