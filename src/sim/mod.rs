/// Anomaly kinds, injection and lifecycle.
pub mod anomaly;
/// Simulated and wall-clock tick sources.
pub mod clock;
pub mod engine;
pub mod kpi;
/// Solar production model.
pub mod physics;
pub mod rng;
pub mod state;
pub mod types;
