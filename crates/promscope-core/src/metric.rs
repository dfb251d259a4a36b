//! Metric identity, value stores, and the typed recording handles.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::counter::CounterStore;
use crate::error::{MetricsError, Result};
use crate::histogram::{Buckets, HistogramStore};
use crate::interner::{CardinalityPolicy, LabelInterner, LabelSetHandle};
use crate::labels::{is_valid_metric_name, LabelSet, BUCKET_LABEL};
use crate::snapshot::{CounterSample, HistogramSample, MetricSnapshot, Samples};
use crate::tally::ErrorTally;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Histogram,
}

impl MetricKind {
    /// Name used on `# TYPE` lines.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Immutable identity of a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    /// Histogram only.
    pub buckets: Option<Buckets>,
    /// Overrides the registry-wide ceiling for this metric.
    pub cardinality_limit: Option<usize>,
}

impl MetricDescriptor {
    pub fn counter(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Counter,
            buckets: None,
            cardinality_limit: None,
        }
    }

    pub fn histogram(name: impl Into<String>, help: impl Into<String>, buckets: Buckets) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Histogram,
            buckets: Some(buckets),
            cardinality_limit: None,
        }
    }

    pub fn with_cardinality_limit(mut self, limit: usize) -> Self {
        self.cardinality_limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_metric_name(&self.name) || self.name.starts_with("__") {
            return Err(MetricsError::InvalidName(self.name.clone()));
        }
        match (self.kind, &self.buckets) {
            (MetricKind::Counter, Some(_)) => {
                return Err(MetricsError::InvalidBuckets(format!(
                    "counter {} cannot have buckets",
                    self.name
                )))
            }
            (MetricKind::Histogram, None) => {
                return Err(MetricsError::InvalidBuckets(format!(
                    "histogram {} needs buckets",
                    self.name
                )))
            }
            _ => {}
        }
        if self.cardinality_limit == Some(0) {
            return Err(MetricsError::BadConfig(format!(
                "cardinality limit of {} must be at least 1",
                self.name
            )));
        }
        Ok(())
    }

    /// Same kind, help, buckets and cardinality override (the name is
    /// compared by the caller).
    pub(crate) fn same_shape(&self, other: &MetricDescriptor) -> bool {
        self.kind == other.kind
            && self.help == other.help
            && self.buckets == other.buckets
            && self.cardinality_limit == other.cardinality_limit
    }
}

enum ValueStore {
    Counter(CounterStore),
    Histogram(HistogramStore),
}

/// A registered metric: descriptor, label interner and value store.
pub struct Metric {
    desc: MetricDescriptor,
    interner: LabelInterner,
    store: ValueStore,
    errors: Option<Arc<ErrorTally>>,
}

/// Shared reference to a registered metric.
pub type MetricHandle = Arc<Metric>;

impl Metric {
    pub(crate) fn new(
        desc: MetricDescriptor,
        policy: CardinalityPolicy,
        errors: Option<Arc<ErrorTally>>,
    ) -> Result<Self> {
        desc.validate()?;
        let (store, reserved): (ValueStore, &'static [&'static str]) = match &desc.buckets {
            None => (ValueStore::Counter(CounterStore::new()), &[]),
            Some(b) => (
                ValueStore::Histogram(HistogramStore::new(b.clone())),
                &[BUCKET_LABEL],
            ),
        };
        Ok(Self {
            interner: LabelInterner::new(desc.name.clone(), policy, reserved),
            desc,
            store,
            errors,
        })
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn kind(&self) -> MetricKind {
        self.desc.kind
    }

    /// Resolve a label set to its handle (allocating under the ceiling).
    pub fn intern(&self, labels: &LabelSet) -> Result<LabelSetHandle> {
        self.track(self.interner.intern(labels))
    }

    /// Distinct label sets counted against the ceiling.
    pub fn cardinality(&self) -> usize {
        self.interner.cardinality()
    }

    pub fn cardinality_limit(&self) -> usize {
        self.interner.limit()
    }

    /// Consistent view of this metric's values.
    pub fn snapshot(&self) -> MetricSnapshot {
        let samples = match &self.store {
            ValueStore::Counter(store) => {
                let values = store.snapshot();
                let sets = self.interner.label_sets();
                Samples::Counter(
                    values
                        .into_iter()
                        .filter_map(|(h, value)| {
                            sets.get(h.index()).map(|labels| CounterSample {
                                labels: labels.clone(),
                                value,
                            })
                        })
                        .collect(),
                )
            }
            ValueStore::Histogram(store) => {
                let values = store.snapshot();
                let sets = self.interner.label_sets();
                let bounds = store.buckets().bounds();
                Samples::Histogram(
                    values
                        .into_iter()
                        .filter_map(|(h, v)| {
                            let labels = sets.get(h.index())?.clone();
                            let buckets = bounds
                                .iter()
                                .copied()
                                .chain(std::iter::once(f64::INFINITY))
                                .zip(v.cumulative)
                                .collect();
                            Some(HistogramSample {
                                labels,
                                buckets,
                                sum: v.sum,
                                count: v.count,
                            })
                        })
                        .collect(),
                )
            }
        };

        MetricSnapshot {
            name: self.desc.name.clone(),
            help: self.desc.help.clone(),
            kind: self.desc.kind,
            samples,
        }
    }

    fn track<T>(&self, r: Result<T>) -> Result<T> {
        if let (Err(e), Some(tally)) = (&r, &self.errors) {
            tally.record(&self.desc.name, e.kind());
        }
        r
    }

    fn owned(&self, handle: LabelSetHandle) -> Result<LabelSetHandle> {
        if self.interner.owns(handle) {
            return Ok(handle);
        }
        self.track(Err(MetricsError::InvalidLabel(format!(
            "handle {} was not issued by {}",
            handle.index(),
            self.desc.name
        ))))
    }

    fn counter_store(&self) -> Result<&CounterStore> {
        match &self.store {
            ValueStore::Counter(s) => Ok(s),
            ValueStore::Histogram(_) => Err(MetricsError::Internal(format!(
                "{} is not a counter",
                self.desc.name
            ))),
        }
    }

    fn histogram_store(&self) -> Result<&HistogramStore> {
        match &self.store {
            ValueStore::Histogram(s) => Ok(s),
            ValueStore::Counter(_) => Err(MetricsError::Internal(format!(
                "{} is not a histogram",
                self.desc.name
            ))),
        }
    }
}

// --------------------
// Counter
// --------------------

/// Recording handle for a counter metric.
#[derive(Clone)]
pub struct Counter {
    metric: MetricHandle,
}

impl Counter {
    pub(crate) fn new(metric: MetricHandle) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> &MetricHandle {
        &self.metric
    }

    pub fn inc(&self, labels: &LabelSet) -> Result<()> {
        self.add(labels, 1.0)
    }

    pub fn add(&self, labels: &LabelSet, delta: f64) -> Result<()> {
        // reject before interning so bad input never consumes cardinality
        if delta.is_nan() || delta < 0.0 {
            return self.metric.track(Err(MetricsError::InvalidDelta(delta)));
        }
        let handle = self.metric.intern(labels)?;
        self.increment(handle, delta)
    }

    /// Add `delta` to a label set interned by this counter. Handles issued
    /// by another metric are rejected.
    pub fn increment(&self, handle: LabelSetHandle, delta: f64) -> Result<()> {
        let handle = self.metric.owned(handle)?;
        let store = self.metric.counter_store()?;
        self.metric.track(store.increment(handle, delta))
    }

    /// Current value for `labels`, or 0 if never recorded.
    pub fn get(&self, labels: &LabelSet) -> f64 {
        match (self.metric.interner.lookup(labels), self.metric.counter_store()) {
            (Some(h), Ok(store)) => store.get(h),
            _ => 0.0,
        }
    }

    /// Pre-intern `labels` for repeated recording.
    pub fn with(&self, labels: &LabelSet) -> Result<BoundCounter> {
        let handle = self.metric.intern(labels)?;
        Ok(BoundCounter {
            counter: self.clone(),
            handle,
        })
    }
}

#[derive(Clone)]
pub struct BoundCounter {
    counter: Counter,
    handle: LabelSetHandle,
}

impl BoundCounter {
    pub fn handle(&self) -> LabelSetHandle {
        self.handle
    }

    pub fn inc(&self) -> Result<()> {
        self.counter.increment(self.handle, 1.0)
    }

    pub fn add(&self, delta: f64) -> Result<()> {
        self.counter.increment(self.handle, delta)
    }
}

// --------------------
// Histogram
// --------------------

/// Recording handle for a histogram metric.
#[derive(Clone)]
pub struct Histogram {
    metric: MetricHandle,
}

impl Histogram {
    pub(crate) fn new(metric: MetricHandle) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> &MetricHandle {
        &self.metric
    }

    pub fn observe(&self, labels: &LabelSet, value: f64) -> Result<()> {
        if value.is_nan() {
            return self
                .metric
                .track(Err(MetricsError::InvalidObservation(value)));
        }
        let handle = self.metric.intern(labels)?;
        self.observe_handle(handle, value)
    }

    /// Observe a duration in seconds.
    pub fn observe_duration(&self, labels: &LabelSet, d: Duration) -> Result<()> {
        self.observe(labels, d.as_secs_f64())
    }

    /// Record into a label set interned by this histogram. Handles issued
    /// by another metric are rejected.
    pub fn observe_handle(&self, handle: LabelSetHandle, value: f64) -> Result<()> {
        let handle = self.metric.owned(handle)?;
        let store = self.metric.histogram_store()?;
        self.metric.track(store.observe(handle, value))
    }

    pub fn with(&self, labels: &LabelSet) -> Result<BoundHistogram> {
        let handle = self.metric.intern(labels)?;
        Ok(BoundHistogram {
            histogram: self.clone(),
            handle,
        })
    }

    /// Start a timer that observes elapsed seconds when stopped or dropped.
    pub fn start_timer(&self, labels: &LabelSet) -> Result<HistogramTimer> {
        Ok(HistogramTimer {
            bound: self.with(labels)?,
            start: Instant::now(),
            observed: false,
        })
    }
}

#[derive(Clone)]
pub struct BoundHistogram {
    histogram: Histogram,
    handle: LabelSetHandle,
}

impl BoundHistogram {
    pub fn handle(&self) -> LabelSetHandle {
        self.handle
    }

    pub fn observe(&self, value: f64) -> Result<()> {
        self.histogram.observe_handle(self.handle, value)
    }
}

#[must_use = "a dropped timer records immediately"]
pub struct HistogramTimer {
    bound: BoundHistogram,
    start: Instant,
    observed: bool,
}

impl HistogramTimer {
    /// Observe the elapsed time and consume the timer.
    pub fn observe_duration(mut self) -> Result<()> {
        self.observed = true;
        self.bound.observe(self.start.elapsed().as_secs_f64())
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        if !self.observed {
            // failures are already counted by the metric
            let _ = self.bound.observe(self.start.elapsed().as_secs_f64());
        }
    }
}
