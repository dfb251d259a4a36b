//! Counter value store.
//!
//! Cells are `f64` accumulators keyed by label set handle. Writers share the
//! `gate` read lock; a snapshot takes it exclusively, so every increment is
//! seen either entirely before or entirely after the snapshot.

use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;

use crate::atomic::AtomicF64;
use crate::error::{MetricsError, Result};
use crate::interner::LabelSetHandle;

#[derive(Default)]
pub struct CounterStore {
    gate: RwLock<()>,
    cells: DashMap<LabelSetHandle, AtomicF64>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a non-negative `delta` to the cell of `handle`.
    pub fn increment(&self, handle: LabelSetHandle, delta: f64) -> Result<()> {
        if delta.is_nan() || delta < 0.0 {
            return Err(MetricsError::InvalidDelta(delta));
        }

        let _g = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = self.cells.get(&handle) {
            cell.add(delta);
            return Ok(());
        }
        self.cells
            .entry(handle)
            .or_insert_with(AtomicF64::zero)
            .add(delta);
        Ok(())
    }

    /// Current value of one cell (0 if never incremented).
    pub fn get(&self, handle: LabelSetHandle) -> f64 {
        self.cells.get(&handle).map(|c| c.get()).unwrap_or(0.0)
    }

    /// All `(handle, value)` pairs at one instant, ordered by handle.
    pub fn snapshot(&self) -> Vec<(LabelSetHandle, f64)> {
        let _g = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<_> = self
            .cells
            .iter()
            .map(|r| (*r.key(), r.value().get()))
            .collect();
        drop(_g);
        out.sort_by_key(|(h, _)| *h);
        out
    }
}
