//! Label set interning with a cardinality ceiling.
//!
//! Every metric owns one interner. A label set is looked up by its canonical
//! form; unseen sets are allocated a dense `LabelSetHandle` under a short
//! allocation lock so the ceiling can never be overshot by racing writers.
//! Handles are never reclaimed, and each one carries the id of the interner
//! that issued it so it cannot be replayed against another metric.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use dashmap::DashMap;

use crate::error::{MetricsError, Result};
use crate::labels::LabelSet;

/// Fallback sets a `Fold` interner may create beyond its ceiling (one per
/// distinct overflowing key set).
pub const FOLD_SET_LIMIT: usize = 4;

static NEXT_INTERNER_ID: AtomicU32 = AtomicU32::new(0);

/// Opaque, process-stable identifier of an interned label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSetHandle {
    owner: u32,
    index: u32,
}

impl LabelSetHandle {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// What to do with a label set that does not fit under the ceiling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Fail the recording with `CardinalityExceeded`.
    #[default]
    Reject,
    /// Record under the same keys with every value replaced by `value`.
    Fold { value: String },
}

/// Cardinality budget shared by every metric of a registry.
#[derive(Debug)]
pub struct CardinalityBudget {
    limit: usize,
    used: AtomicUsize,
}

impl CardinalityBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    fn try_reserve(&self) -> bool {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok()
    }
}

/// Ceiling configuration for one interner.
#[derive(Debug, Clone)]
pub struct CardinalityPolicy {
    pub limit: usize,
    pub overflow: OverflowPolicy,
    pub shared: Option<Arc<CardinalityBudget>>,
}

impl CardinalityPolicy {
    pub fn per_metric(limit: usize) -> Self {
        Self {
            limit,
            overflow: OverflowPolicy::Reject,
            shared: None,
        }
    }
}

pub struct LabelInterner {
    id: u32,
    metric: String,
    policy: CardinalityPolicy,
    reserved: &'static [&'static str],
    by_set: DashMap<LabelSet, LabelSetHandle>,
    sets: RwLock<Vec<LabelSet>>,
    alloc: Mutex<()>,
    // distinct sets counted against the ceiling (fold targets are not)
    counted: AtomicUsize,
    // fold targets, capped at FOLD_SET_LIMIT
    folded: AtomicUsize,
    allocated: AtomicUsize,
    overflow_logged: AtomicBool,
}

impl LabelInterner {
    pub fn new(
        metric: impl Into<String>,
        policy: CardinalityPolicy,
        reserved: &'static [&'static str],
    ) -> Self {
        Self {
            id: NEXT_INTERNER_ID.fetch_add(1, Ordering::Relaxed),
            metric: metric.into(),
            policy,
            reserved,
            by_set: DashMap::new(),
            sets: RwLock::new(Vec::new()),
            alloc: Mutex::new(()),
            counted: AtomicUsize::new(0),
            folded: AtomicUsize::new(0),
            allocated: AtomicUsize::new(0),
            overflow_logged: AtomicBool::new(false),
        }
    }

    /// Resolve `labels` to its handle, allocating one on first use.
    pub fn intern(&self, labels: &LabelSet) -> Result<LabelSetHandle> {
        if let Some(h) = self.by_set.get(labels) {
            return Ok(*h);
        }

        let _alloc = self.alloc.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(h) = self.by_set.get(labels) {
            return Ok(*h);
        }
        labels.validate(self.reserved)?;

        if self.counted.load(Ordering::Acquire) < self.policy.limit && self.reserve_shared() {
            let h = self.allocate(labels.clone())?;
            self.counted.fetch_add(1, Ordering::AcqRel);
            tracing::debug!(
                metric = %self.metric,
                labels = %labels,
                handle = h.index,
                "new label set"
            );
            return Ok(h);
        }

        self.on_overflow(labels)
    }

    /// Handle of an already interned set, without allocating.
    pub fn lookup(&self, labels: &LabelSet) -> Option<LabelSetHandle> {
        self.by_set.get(labels).map(|h| *h)
    }

    /// True if `handle` was issued by this interner.
    pub fn owns(&self, handle: LabelSetHandle) -> bool {
        handle.owner == self.id && handle.index() < self.allocated.load(Ordering::Acquire)
    }

    /// Number of distinct label sets counted against the ceiling.
    pub fn cardinality(&self) -> usize {
        self.counted.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> usize {
        self.policy.limit
    }

    pub fn label_set(&self, handle: LabelSetHandle) -> Option<LabelSet> {
        let sets = self.sets.read().unwrap_or_else(PoisonError::into_inner);
        sets.get(handle.index()).cloned()
    }

    /// Copy of the handle -> label set table, indexed by `LabelSetHandle::index`.
    pub fn label_sets(&self) -> Vec<LabelSet> {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn reserve_shared(&self) -> bool {
        match &self.policy.shared {
            Some(budget) => budget.try_reserve(),
            None => true,
        }
    }

    // caller holds `alloc`
    fn allocate(&self, labels: LabelSet) -> Result<LabelSetHandle> {
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        let idx = u32::try_from(sets.len())
            .map_err(|_| MetricsError::Internal("label set handle space exhausted".into()))?;
        let h = LabelSetHandle {
            owner: self.id,
            index: idx,
        };
        sets.push(labels.clone());
        self.allocated.store(sets.len(), Ordering::Release);
        drop(sets);
        self.by_set.insert(labels, h);
        Ok(h)
    }

    // caller holds `alloc`
    fn on_overflow(&self, labels: &LabelSet) -> Result<LabelSetHandle> {
        let limit = match &self.policy.shared {
            Some(budget) if self.counted.load(Ordering::Acquire) < self.policy.limit => {
                budget.limit()
            }
            _ => self.policy.limit,
        };

        if !self.overflow_logged.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                metric = %self.metric,
                limit,
                policy = ?self.policy.overflow,
                "label cardinality limit reached"
            );
        }

        let exceeded = || MetricsError::CardinalityExceeded {
            metric: self.metric.clone(),
            limit,
        };
        match &self.policy.overflow {
            OverflowPolicy::Reject => Err(exceeded()),
            OverflowPolicy::Fold { value } => {
                let folded = labels.fold_values(value);
                if let Some(h) = self.by_set.get(&folded) {
                    return Ok(*h);
                }
                if self.folded.load(Ordering::Acquire) >= FOLD_SET_LIMIT {
                    return Err(exceeded());
                }
                let h = self.allocate(folded)?;
                self.folded.fetch_add(1, Ordering::AcqRel);
                Ok(h)
            }
        }
    }
}
