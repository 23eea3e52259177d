//! Publication interface between the engine and the metrics exposition.
//!
//! The engine only knows the two operations of [`MetricSink`]. Two sinks are
//! provided: [`MemorySink`] for replays and tests, and [`PrometheusSink`]
//! which writes into a `prometheus::Registry` served on `/metrics`.

mod memory;
mod prom;

pub use memory::MemorySink;
pub use prom::PrometheusSink;

/// Per-panel power (W); labels `farm`, `panel_id`.
pub const POWER_WATTS: &str = "solar_power_watts";
/// Farm irradiance (W/m²); label `farm`.
pub const IRRADIANCE_WM2: &str = "solar_irradiance_wm2";
/// Per-panel temperature (°C); labels `farm`, `panel_id`.
pub const PANEL_TEMPERATURE_CELSIUS: &str = "solar_panel_temperature_celsius";
/// Inverter status, 1 = OK and 0 = failed; labels `farm`, `inverter_id`.
pub const INVERTER_STATUS: &str = "solar_inverter_status";
/// Cumulative revenue counter (€); label `farm`.
pub const DAILY_REVENUE_EUROS_TOTAL: &str = "solar_daily_revenue_euros_total";
/// Anomaly occurrences; labels `farm`, `type`.
pub const ANOMALIES_TOTAL: &str = "solar_anomalies_total";
/// Output relative to installed peak (%); label `farm`.
pub const EFFICIENCY_PERCENT: &str = "solar_efficiency_percent";
/// Farm output (W); label `farm`.
pub const FARM_TOTAL_POWER_WATTS: &str = "solar_farm_total_power_watts";
/// Uptime over elapsed time; label `farm`.
pub const AVAILABILITY_RATIO: &str = "solar_availability_ratio";

/// Whether a series is a gauge or a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// Declaration of one published series.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
}

/// Every series the engine publishes.
pub const SERIES: &[MetricSpec] = &[
    MetricSpec {
        name: POWER_WATTS,
        help: "Instantaneous power per sample panel (watts)",
        kind: MetricKind::Gauge,
        labels: &["farm", "panel_id"],
    },
    MetricSpec {
        name: IRRADIANCE_WM2,
        help: "Measured solar irradiance (W/m2)",
        kind: MetricKind::Gauge,
        labels: &["farm"],
    },
    MetricSpec {
        name: PANEL_TEMPERATURE_CELSIUS,
        help: "Panel temperature (celsius)",
        kind: MetricKind::Gauge,
        labels: &["farm", "panel_id"],
    },
    MetricSpec {
        name: INVERTER_STATUS,
        help: "Inverter state (1=OK, 0=KO)",
        kind: MetricKind::Gauge,
        labels: &["farm", "inverter_id"],
    },
    MetricSpec {
        name: DAILY_REVENUE_EUROS_TOTAL,
        help: "Estimated feed-in revenue, cumulative (euros)",
        kind: MetricKind::Counter,
        labels: &["farm"],
    },
    MetricSpec {
        name: ANOMALIES_TOTAL,
        help: "Total number of injected anomalies",
        kind: MetricKind::Counter,
        labels: &["farm", "type"],
    },
    MetricSpec {
        name: EFFICIENCY_PERCENT,
        help: "Instantaneous farm efficiency against installed peak (%)",
        kind: MetricKind::Gauge,
        labels: &["farm"],
    },
    MetricSpec {
        name: FARM_TOTAL_POWER_WATTS,
        help: "Total farm power output (watts)",
        kind: MetricKind::Gauge,
        labels: &["farm"],
    },
    MetricSpec {
        name: AVAILABILITY_RATIO,
        help: "Estimated availability since start (0-1)",
        kind: MetricKind::Gauge,
        labels: &["farm"],
    },
];

/// Looks up the declaration of `name`.
pub fn spec_for(name: &str) -> Option<&'static MetricSpec> {
    SERIES.iter().find(|s| s.name == name)
}

/// Label set of one sample, as `(label, value)` pairs.
pub type Labels<'a> = [(&'a str, &'a str)];

/// Failure while recording a measurement.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("unknown metric `{0}`")]
    UnknownMetric(String),

    #[error("metric `{name}` is a {actual:?}, not a {expected:?}")]
    KindMismatch {
        name: String,
        expected: MetricKind,
        actual: MetricKind,
    },

    #[error("metric `{name}` expects labels {expected:?}, got {got:?}")]
    LabelMismatch {
        name: String,
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("counter `{name}` cannot be decreased (delta {delta})")]
    NegativeDelta { name: String, delta: f64 },

    #[error("prometheus: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Narrow publication contract used by the engine.
pub trait MetricSink {
    /// Sets a gauge; last write wins per label set.
    fn set_gauge(&self, name: &str, labels: &Labels<'_>, value: f64) -> Result<(), SinkError>;

    /// Increases a counter by `delta` (must be >= 0).
    fn inc_counter(&self, name: &str, labels: &Labels<'_>, delta: f64) -> Result<(), SinkError>;
}

impl<S: MetricSink + ?Sized> MetricSink for &S {
    fn set_gauge(&self, name: &str, labels: &Labels<'_>, value: f64) -> Result<(), SinkError> {
        (**self).set_gauge(name, labels, value)
    }

    fn inc_counter(&self, name: &str, labels: &Labels<'_>, delta: f64) -> Result<(), SinkError> {
        (**self).inc_counter(name, labels, delta)
    }
}

impl<S: MetricSink + ?Sized> MetricSink for std::sync::Arc<S> {
    fn set_gauge(&self, name: &str, labels: &Labels<'_>, value: f64) -> Result<(), SinkError> {
        (**self).set_gauge(name, labels, value)
    }

    fn inc_counter(&self, name: &str, labels: &Labels<'_>, delta: f64) -> Result<(), SinkError> {
        (**self).inc_counter(name, labels, delta)
    }
}

/// Checks `name` is declared with `expected` kind.
fn check_kind(name: &str, expected: MetricKind) -> Result<&'static MetricSpec, SinkError> {
    let spec = spec_for(name).ok_or_else(|| SinkError::UnknownMetric(name.to_string()))?;
    if spec.kind != expected {
        return Err(SinkError::KindMismatch {
            name: name.to_string(),
            expected,
            actual: spec.kind,
        });
    }
    Ok(spec)
}

/// Checks the label names of a sample against the declaration.
fn check_labels(spec: &MetricSpec, labels: &Labels<'_>) -> Result<(), SinkError> {
    let matches = labels.len() == spec.labels.len()
        && spec
            .labels
            .iter()
            .all(|want| labels.iter().any(|(name, _)| name == want));
    if matches {
        return Ok(());
    }
    Err(SinkError::LabelMismatch {
        name: spec.name.to_string(),
        expected: spec.labels.iter().map(|l| l.to_string()).collect(),
        got: labels.iter().map(|(name, _)| name.to_string()).collect(),
    })
}

/// Validates a counter delta.
fn check_delta(name: &str, delta: f64) -> Result<(), SinkError> {
    if delta < 0.0 || delta.is_nan() {
        return Err(SinkError::NegativeDelta {
            name: name.to_string(),
            delta,
        });
    }
    Ok(())
}
