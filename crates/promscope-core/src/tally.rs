//! Internal counter of failed recordings, exported next to user metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::error::ErrorKind;
use crate::labels::LabelSet;
use crate::metric::MetricKind;
use crate::snapshot::{CounterSample, MetricSnapshot, Samples};

pub const ERROR_METRIC_NAME: &str = "metrics_recording_errors_total";

pub struct ErrorTally {
    name: String,
    counts: DashMap<(String, ErrorKind), AtomicU64>,
}

impl ErrorTally {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counts: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&self, metric: &str, kind: ErrorKind) {
        let key = (metric.to_string(), kind);
        if let Some(c) = self.counts.get(&key) {
            c.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.counts
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, metric: &str, kind: ErrorKind) -> u64 {
        self.counts
            .get(&(metric.to_string(), kind))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        let mut samples: Vec<CounterSample> = self
            .counts
            .iter()
            .map(|r| {
                let (metric, kind) = r.key();
                CounterSample {
                    labels: LabelSet::from_pairs(&[
                        ("metric", metric.as_str()),
                        ("reason", kind.as_str()),
                    ]),
                    value: r.value().load(Ordering::Relaxed) as f64,
                }
            })
            .collect();
        samples.sort_by(|a, b| a.labels.cmp(&b.labels));

        MetricSnapshot {
            name: self.name.clone(),
            help: "Recordings dropped because of invalid input or cardinality limits.".into(),
            kind: MetricKind::Counter,
            samples: Samples::Counter(samples),
        }
    }
}
