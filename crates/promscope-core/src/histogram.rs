//! Histogram buckets and value store.
//!
//! Buckets are cumulative: an observation increments its own bucket and every
//! bucket above it, including the implicit `+Inf` bucket, which therefore
//! always equals `count`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;

use crate::atomic::AtomicF64;
use crate::error::{MetricsError, Result};
use crate::interner::LabelSetHandle;

/// Prometheus client default buckets (seconds).
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Strictly increasing finite upper bounds. `+Inf` is implicit.
#[derive(Debug, Clone, PartialEq)]
pub struct Buckets {
    bounds: Arc<[f64]>,
}

impl Buckets {
    /// Validate a user-supplied bound list. A trailing `+Inf` is dropped.
    pub fn new(mut bounds: Vec<f64>) -> Result<Self> {
        if bounds.last() == Some(&f64::INFINITY) {
            bounds.pop();
        }
        for b in &bounds {
            if !b.is_finite() {
                return Err(MetricsError::InvalidBuckets(format!("non-finite bound: {b}")));
            }
        }
        if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
            return Err(MetricsError::InvalidBuckets(format!(
                "bounds must be strictly increasing ({} >= {})",
                w[0], w[1]
            )));
        }
        Ok(Self {
            bounds: bounds.into(),
        })
    }

    pub fn default_latency() -> Self {
        Self {
            bounds: DEFAULT_BUCKETS.to_vec().into(),
        }
    }

    /// `count` bounds starting at `start`, `width` apart.
    pub fn linear(start: f64, width: f64, count: usize) -> Result<Self> {
        if count == 0 || width.is_nan() || width <= 0.0 {
            return Err(MetricsError::InvalidBuckets(
                "linear buckets need count >= 1 and width > 0".into(),
            ));
        }
        Self::new((0..count).map(|i| start + width * i as f64).collect())
    }

    /// `count` bounds starting at `start`, each `factor` times the previous.
    pub fn exponential(start: f64, factor: f64, count: usize) -> Result<Self> {
        if count == 0 || start.is_nan() || start <= 0.0 || factor.is_nan() || factor <= 1.0 {
            return Err(MetricsError::InvalidBuckets(
                "exponential buckets need count >= 1, start > 0 and factor > 1".into(),
            ));
        }
        let mut out = Vec::with_capacity(count);
        let mut b = start;
        for _ in 0..count {
            out.push(b);
            b *= factor;
        }
        Self::new(out)
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Index of the first bucket whose upper bound is >= `value`
    /// (`bounds().len()` means the `+Inf` bucket).
    pub fn position(&self, value: f64) -> usize {
        self.bounds.partition_point(|b| *b < value)
    }
}

struct HistogramCell {
    // bounds.len() + 1 entries, last one is +Inf
    buckets: Box<[AtomicU64]>,
    sum: AtomicF64,
    count: AtomicU64,
}

impl HistogramCell {
    fn new(n: usize) -> Self {
        Self {
            buckets: (0..=n).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicF64::zero(),
            count: AtomicU64::new(0),
        }
    }

    fn record(&self, from: usize, value: f64) {
        for b in &self.buckets[from..] {
            b.fetch_add(1, Ordering::Relaxed);
        }
        self.sum.add(value);
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time state of one histogram cell.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramValue {
    /// Cumulative counts, parallel to the bounds plus a final `+Inf` entry.
    pub cumulative: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

pub struct HistogramStore {
    buckets: Buckets,
    gate: RwLock<()>,
    cells: DashMap<LabelSetHandle, HistogramCell>,
}

impl HistogramStore {
    pub fn new(buckets: Buckets) -> Self {
        Self {
            buckets,
            gate: RwLock::new(()),
            cells: DashMap::new(),
        }
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Record one observation. NaN is rejected; infinities land in the
    /// first or the `+Inf` bucket.
    pub fn observe(&self, handle: LabelSetHandle, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(MetricsError::InvalidObservation(value));
        }
        let from = self.buckets.position(value);

        let _g = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = self.cells.get(&handle) {
            cell.record(from, value);
            return Ok(());
        }
        let n = self.buckets.bounds().len();
        self.cells
            .entry(handle)
            .or_insert_with(|| HistogramCell::new(n))
            .record(from, value);
        Ok(())
    }

    /// All cells at one instant, ordered by handle.
    pub fn snapshot(&self) -> Vec<(LabelSetHandle, HistogramValue)> {
        let _g = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<_> = self
            .cells
            .iter()
            .map(|r| {
                let cell = r.value();
                let value = HistogramValue {
                    cumulative: cell
                        .buckets
                        .iter()
                        .map(|b| b.load(Ordering::Relaxed))
                        .collect(),
                    sum: cell.sum.get(),
                    count: cell.count.load(Ordering::Relaxed),
                };
                (*r.key(), value)
            })
            .collect();
        drop(_g);
        out.sort_by_key(|(h, _)| *h);
        out
    }
}
