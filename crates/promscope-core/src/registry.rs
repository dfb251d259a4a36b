//! Metric registry.
//!
//! Explicitly constructed and shared through `Arc`; there is no global
//! default registry. Metrics are only ever added. The registry lock guards
//! the name table and registration order, never the value stores, so
//! recording and scraping do not contend on it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{ErrorKind, MetricsError, Result};
use crate::histogram::Buckets;
use crate::interner::{CardinalityBudget, CardinalityPolicy, OverflowPolicy};
use crate::metric::{Counter, Histogram, Metric, MetricDescriptor, MetricHandle, MetricKind};
use crate::snapshot::RegistrySnapshot;
use crate::tally::{ErrorTally, ERROR_METRIC_NAME};

/// Fallback per-metric ceiling when the embedding application sets none.
pub const DEFAULT_CARDINALITY_LIMIT: usize = 500;

/// Where the cardinality ceiling is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityScope {
    /// Each metric has its own ceiling.
    PerMetric,
    /// Each metric has its own ceiling and all metrics also share
    /// one registry-wide budget of the given size.
    Registry { limit: usize },
}

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Prefix joined to every registered name with `_`.
    pub namespace: Option<String>,
    pub cardinality_limit: usize,
    pub cardinality_scope: CardinalityScope,
    pub overflow: OverflowPolicy,
    /// Export `metrics_recording_errors_total`.
    pub count_errors: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            cardinality_limit: DEFAULT_CARDINALITY_LIMIT,
            cardinality_scope: CardinalityScope::PerMetric,
            overflow: OverflowPolicy::Reject,
            count_errors: true,
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    by_name: HashMap<String, MetricHandle>,
    order: Vec<MetricHandle>,
}

pub struct Registry {
    opts: RegistryOptions,
    budget: Option<Arc<CardinalityBudget>>,
    errors: Option<Arc<ErrorTally>>,
    inner: RwLock<RegistryInner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryOptions::default())
    }
}

impl Registry {
    pub fn new(opts: RegistryOptions) -> Self {
        let budget = match opts.cardinality_scope {
            CardinalityScope::PerMetric => None,
            CardinalityScope::Registry { limit } => Some(Arc::new(CardinalityBudget::new(limit))),
        };
        let errors = opts.count_errors.then(|| {
            let name = prefixed(opts.namespace.as_deref(), ERROR_METRIC_NAME);
            Arc::new(ErrorTally::new(name))
        });
        Self {
            opts,
            budget,
            errors,
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.opts
    }

    /// Register a new metric. Fails with `NameCollision` if the (namespaced)
    /// name is taken, even by an identical descriptor; use `get_or_create`
    /// for idempotent registration.
    pub fn register(&self, desc: MetricDescriptor) -> Result<MetricHandle> {
        let desc = self.qualify(desc)?;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.by_name.get(&desc.name) {
            return Err(MetricsError::NameCollision {
                name: desc.name,
                existing: existing.kind().as_str().to_string(),
            });
        }
        self.insert(&mut inner, desc)
    }

    /// Return the metric registered under this name if its kind, help,
    /// buckets and cardinality override match, otherwise register it.
    pub fn get_or_create(&self, desc: MetricDescriptor) -> Result<MetricHandle> {
        let desc = self.qualify(desc)?;
        {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = inner.by_name.get(&desc.name) {
                return check_shape(existing, desc);
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.by_name.get(&desc.name) {
            return check_shape(existing, desc);
        }
        self.insert(&mut inner, desc)
    }

    /// Get or create a counter.
    pub fn counter(&self, name: &str, help: &str) -> Result<Counter> {
        self.get_or_create(MetricDescriptor::counter(name, help))
            .map(Counter::new)
    }

    /// Get or create a histogram.
    pub fn histogram(&self, name: &str, help: &str, buckets: Buckets) -> Result<Histogram> {
        self.get_or_create(MetricDescriptor::histogram(name, help, buckets))
            .map(Histogram::new)
    }

    /// Look up by fully qualified name.
    pub fn get(&self, name: &str) -> Option<MetricHandle> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_name.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every metric in registration order. The registry lock is not
    /// held while the visitor runs.
    pub fn for_each(&self, mut visitor: impl FnMut(&Metric)) {
        let metrics: Vec<MetricHandle> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone();
        for m in &metrics {
            visitor(m);
        }
    }

    /// Snapshot every metric (each one internally consistent), followed by
    /// the recording-error counter when enabled.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut out = RegistrySnapshot::default();
        self.for_each(|m| out.metrics.push(m.snapshot()));
        if let Some(tally) = &self.errors {
            out.metrics.push(tally.snapshot());
        }
        out
    }

    /// Count of recording failures for one metric and reason.
    pub fn recording_errors(&self, metric: &str, kind: ErrorKind) -> u64 {
        self.errors
            .as_ref()
            .map(|t| t.get(metric, kind))
            .unwrap_or(0)
    }

    fn qualify(&self, mut desc: MetricDescriptor) -> Result<MetricDescriptor> {
        desc.name = prefixed(self.opts.namespace.as_deref(), &desc.name);
        desc.validate()?;
        if let Some(tally) = &self.errors {
            if tally.name() == desc.name {
                return Err(MetricsError::NameCollision {
                    name: desc.name,
                    existing: MetricKind::Counter.as_str().to_string(),
                });
            }
        }
        Ok(desc)
    }

    // caller holds the write lock
    fn insert(&self, inner: &mut RegistryInner, desc: MetricDescriptor) -> Result<MetricHandle> {
        let policy = CardinalityPolicy {
            limit: desc.cardinality_limit.unwrap_or(self.opts.cardinality_limit),
            overflow: self.opts.overflow.clone(),
            shared: self.budget.clone(),
        };
        let name = desc.name.clone();
        let kind = desc.kind;
        let metric = Arc::new(Metric::new(desc, policy, self.errors.clone())?);
        inner.by_name.insert(name.clone(), Arc::clone(&metric));
        inner.order.push(Arc::clone(&metric));
        tracing::debug!(metric = %name, kind = kind.as_str(), "metric registered");
        Ok(metric)
    }
}

fn check_shape(existing: &MetricHandle, desc: MetricDescriptor) -> Result<MetricHandle> {
    if existing.descriptor().same_shape(&desc) {
        Ok(Arc::clone(existing))
    } else {
        Err(MetricsError::NameCollision {
            name: desc.name,
            existing: existing.kind().as_str().to_string(),
        })
    }
}

fn prefixed(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}_{name}"),
        _ => name.to_string(),
    }
}
