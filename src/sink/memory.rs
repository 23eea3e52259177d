use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::{Labels, MetricKind, MetricSink, SinkError, check_delta, check_kind, check_labels};

type SeriesKey = (String, Vec<(String, String)>);

/// In-process sink that keeps the latest value of every series.
///
/// Used by offline replays and tests; applies the same declaration checks as
/// [`PrometheusSink`](super::PrometheusSink).
#[derive(Debug, Default)]
pub struct MemorySink {
    values: Mutex<BTreeMap<SeriesKey, f64>>,
}

fn key(name: &str, labels: &Labels<'_>) -> SeriesKey {
    let mut pairs: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    pairs.sort();
    (name.to_string(), pairs)
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a series, if it was ever written.
    pub fn value(&self, name: &str, labels: &Labels<'_>) -> Option<f64> {
        self.values.lock().get(&key(name, labels)).copied()
    }

    /// Number of distinct series written so far.
    pub fn series_count(&self) -> usize {
        self.values.lock().len()
    }

    /// Sum of a metric across every label set.
    pub fn sum(&self, name: &str) -> f64 {
        self.values
            .lock()
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|(_, v)| *v)
            .sum()
    }
}

impl MetricSink for MemorySink {
    fn set_gauge(&self, name: &str, labels: &Labels<'_>, value: f64) -> Result<(), SinkError> {
        let spec = check_kind(name, MetricKind::Gauge)?;
        check_labels(spec, labels)?;
        self.values.lock().insert(key(name, labels), value);
        Ok(())
    }

    fn inc_counter(&self, name: &str, labels: &Labels<'_>, delta: f64) -> Result<(), SinkError> {
        let spec = check_kind(name, MetricKind::Counter)?;
        check_labels(spec, labels)?;
        check_delta(name, delta)?;
        *self.values.lock().entry(key(name, labels)).or_insert(0.0) += delta;
        Ok(())
    }
}
