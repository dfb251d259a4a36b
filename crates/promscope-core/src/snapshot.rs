//! Read-only views of metric state handed to the encoder.

use crate::labels::LabelSet;
use crate::metric::MetricKind;

/// Per-metric snapshots in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub metrics: Vec<MetricSnapshot>,
}

impl RegistrySnapshot {
    pub fn get(&self, name: &str) -> Option<&MetricSnapshot> {
        self.metrics.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub samples: Samples,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Counter(Vec<CounterSample>),
    Histogram(Vec<HistogramSample>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CounterSample {
    pub labels: LabelSet,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSample {
    pub labels: LabelSet,
    /// `(upper bound, cumulative count)`, ending with `(+Inf, count)`.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramSample {
    /// Cumulative count of the bucket whose upper bound is `le`.
    pub fn bucket(&self, le: f64) -> Option<u64> {
        self.buckets.iter().find(|(b, _)| *b == le).map(|(_, c)| *c)
    }
}

impl MetricSnapshot {
    pub fn counter(&self, labels: &LabelSet) -> Option<f64> {
        match &self.samples {
            Samples::Counter(s) => s.iter().find(|c| &c.labels == labels).map(|c| c.value),
            Samples::Histogram(_) => None,
        }
    }

    pub fn histogram(&self, labels: &LabelSet) -> Option<&HistogramSample> {
        match &self.samples {
            Samples::Histogram(s) => s.iter().find(|h| &h.labels == labels),
            Samples::Counter(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.samples {
            Samples::Counter(s) => s.len(),
            Samples::Histogram(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
