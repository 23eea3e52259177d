//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use solar_farm_sim::config::SimulatorConfig;
use solar_farm_sim::sim::engine::Engine;
use solar_farm_sim::sim::rng::{RandomSource, SequenceRng};
use solar_farm_sim::sim::types::{Farm, SimConfig};

/// 2024-06-01 at the given UTC hour.
pub fn june_first(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
}

/// Baseline engine settings with irradiance jitter disabled.
pub fn steady_config() -> SimConfig {
    SimConfig {
        irradiance_jitter: false,
        ..SimConfig::default()
    }
}

/// The three baseline farms.
pub fn baseline_farms() -> Vec<Farm> {
    SimulatorConfig::baseline().farms()
}

/// Random source that never triggers an anomaly.
pub fn quiet_rng() -> SequenceRng {
    SequenceRng::constant(0.5)
}

/// Engine over the baseline fleet, started at `start`.
pub fn baseline_engine<R: RandomSource>(config: SimConfig, rng: R, start: DateTime<Utc>) -> Engine<R> {
    Engine::new(config, baseline_farms(), rng, start)
}
