//! Stochastic anomaly injection and per-cycle anomaly lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};

use super::rng::RandomSource;
use super::types::CycleMetrics;

/// Closed set of fault conditions that can be injected into a farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnomalyKind {
    /// Inverter trips: farm output drops to zero.
    InverterFailure,
    /// Panels run 30 °C hotter than the model predicts.
    Overheat,
    /// Per-panel sensors stop reporting.
    SensorLoss,
    /// Output loses 15–25 %.
    Degradation,
    /// Output scaled to 40–60 %.
    Shade,
}

impl AnomalyKind {
    /// All kinds, in the order used for uniform selection.
    pub const ALL: [AnomalyKind; 5] = [
        AnomalyKind::InverterFailure,
        AnomalyKind::Overheat,
        AnomalyKind::SensorLoss,
        AnomalyKind::Degradation,
        AnomalyKind::Shade,
    ];

    /// Label value used in published metrics and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyKind::InverterFailure => "inverter_failure",
            AnomalyKind::Overheat => "overheat",
            AnomalyKind::SensorLoss => "sensor_loss",
            AnomalyKind::Degradation => "degradation",
            AnomalyKind::Shade => "shade",
        }
    }

    /// Maps a uniform sample in `[0, 1)` onto a kind.
    pub fn from_sample(sample: f64) -> Self {
        let idx = (sample * Self::ALL.len() as f64).floor() as usize;
        Self::ALL[idx.min(Self::ALL.len() - 1)]
    }

    /// Applies this kind's effect to one cycle's metrics.
    ///
    /// Degradation and shade draw one sample each from `rng`; the other kinds
    /// draw nothing.
    pub fn apply<R: RandomSource + ?Sized>(self, metrics: &mut CycleMetrics, rng: &mut R) {
        match self {
            AnomalyKind::InverterFailure => {
                metrics.production_total_watts = 0.0;
                metrics.inverter_down = true;
            }
            AnomalyKind::Overheat => {
                metrics.panel_temperature += 30.0;
            }
            AnomalyKind::SensorLoss => {
                metrics.sensor_loss = true;
            }
            AnomalyKind::Degradation => {
                metrics.production_total_watts *= 1.0 - (0.15 + 0.10 * rng.next_f64());
            }
            AnomalyKind::Shade => {
                metrics.production_total_watts *= 0.40 + 0.20 * rng.next_f64();
            }
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An active, time-limited fault owned by one farm.
#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    /// Fault type.
    pub kind: AnomalyKind,
    /// Cycles left, including the current one (always >= 1 while active).
    pub remaining_cycles: u32,
    /// Wall-clock time of injection.
    pub injected_at: DateTime<Utc>,
}

/// Injection odds and duration bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyPolicy {
    /// Probability of injecting one anomaly per farm per cycle.
    pub injection_probability: f64,
    /// Longest possible anomaly, in cycles (>= 1).
    pub max_duration_cycles: u32,
}

impl Default for AnomalyPolicy {
    fn default() -> Self {
        Self {
            injection_probability: 0.10,
            max_duration_cycles: 10,
        }
    }
}

/// Draws whether an anomaly starts this cycle and, if so, its kind and length.
///
/// Consumes one sample when nothing is injected and three otherwise
/// (trigger, kind, duration). Duration is `1 + floor(sample * max)`.
pub fn maybe_inject<R: RandomSource + ?Sized>(
    rng: &mut R,
    policy: &AnomalyPolicy,
    now: DateTime<Utc>,
) -> Option<Anomaly> {
    if rng.next_f64() >= policy.injection_probability {
        return None;
    }

    let kind = AnomalyKind::from_sample(rng.next_f64());
    let max = policy.max_duration_cycles.max(1);
    let extra = (rng.next_f64() * f64::from(max)).floor() as u32;
    Some(Anomaly {
        kind,
        remaining_cycles: 1 + extra.min(max - 1),
        injected_at: now,
    })
}

/// Applies every active anomaly in insertion order, then ages them.
///
/// Anomalies whose counter reaches zero are dropped. Effects always run
/// before aging, so an anomaly of duration N affects exactly N cycles.
pub fn apply_and_age<R: RandomSource + ?Sized>(
    active: &mut Vec<Anomaly>,
    metrics: &mut CycleMetrics,
    rng: &mut R,
) {
    for anomaly in active.iter() {
        anomaly.kind.apply(metrics, rng);
    }
    for anomaly in active.iter_mut() {
        anomaly.remaining_cycles = anomaly.remaining_cycles.saturating_sub(1);
    }
    active.retain(|a| a.remaining_cycles > 0);
}
