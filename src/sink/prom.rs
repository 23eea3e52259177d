use std::collections::HashMap;
use std::sync::Arc;

use prometheus::{CounterVec, GaugeVec, Opts, Registry, TextEncoder};

use super::{
    Labels, MetricKind, MetricSink, SERIES, SinkError, check_delta, check_kind, check_labels,
};

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

/// Sink writing into a Prometheus registry.
///
/// Every declared series is registered up front; a series shows up in the
/// exposition once its first label set has been written.
pub struct PrometheusSink {
    registry: Arc<Registry>,
    families: HashMap<&'static str, Family>,
}

impl PrometheusSink {
    /// Registers all series against `registry`.
    ///
    /// # Errors
    ///
    /// Fails if a series with the same name is already registered.
    pub fn new(registry: Arc<Registry>) -> Result<Self, SinkError> {
        let mut families = HashMap::with_capacity(SERIES.len());
        for spec in SERIES {
            let opts = Opts::new(spec.name, spec.help);
            let family = match spec.kind {
                MetricKind::Gauge => {
                    let vec = GaugeVec::new(opts, spec.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    Family::Gauge(vec)
                }
                MetricKind::Counter => {
                    let vec = CounterVec::new(opts, spec.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    Family::Counter(vec)
                }
            };
            families.insert(spec.name, family);
        }
        Ok(Self { registry, families })
    }

    /// Registry backing this sink.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Renders the registry in the Prometheus text format.
    pub fn encode(&self) -> Result<String, SinkError> {
        let encoder = TextEncoder::new();
        Ok(encoder.encode_to_string(&self.registry.gather())?)
    }
}

fn label_map<'a>(labels: &'a Labels<'a>) -> HashMap<&'a str, &'a str> {
    labels.iter().copied().collect()
}

impl MetricSink for PrometheusSink {
    fn set_gauge(&self, name: &str, labels: &Labels<'_>, value: f64) -> Result<(), SinkError> {
        let spec = check_kind(name, MetricKind::Gauge)?;
        check_labels(spec, labels)?;
        match self.families.get(spec.name) {
            Some(Family::Gauge(vec)) => {
                vec.get_metric_with(&label_map(labels))?.set(value);
                Ok(())
            }
            _ => Err(SinkError::UnknownMetric(name.to_string())),
        }
    }

    fn inc_counter(&self, name: &str, labels: &Labels<'_>, delta: f64) -> Result<(), SinkError> {
        let spec = check_kind(name, MetricKind::Counter)?;
        check_labels(spec, labels)?;
        check_delta(name, delta)?;
        match self.families.get(spec.name) {
            Some(Family::Counter(vec)) => {
                vec.get_metric_with(&label_map(labels))?.inc_by(delta);
                Ok(())
            }
            _ => Err(SinkError::UnknownMetric(name.to_string())),
        }
    }
}
