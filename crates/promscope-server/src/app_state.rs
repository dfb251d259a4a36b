//! Shared application state for the promscope server.
//!
//! The registry is constructed here (or handed in by an embedding
//! application) and shared by `Arc`; there is no process-global registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use promscope_core::error::Result;
use promscope_core::Registry;

use crate::config::AppConfig;
use crate::obs::HttpMetrics;
use crate::services::GreetService;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: AppConfig,
    registry: Arc<Registry>,
    http: Option<HttpMetrics>,
    greet: GreetService,
    draining: AtomicBool,
}

impl AppState {
    /// Build state with a fresh registry configured from `cfg.metrics`.
    pub fn new(cfg: AppConfig) -> Result<Self> {
        let registry = Arc::new(Registry::new(cfg.metrics.registry_options()));
        Self::with_registry(cfg, registry)
    }

    /// Build state around an existing registry (its options win over
    /// `cfg.metrics`).
    pub fn with_registry(cfg: AppConfig, registry: Arc<Registry>) -> Result<Self> {
        let http = if cfg.http.enabled {
            Some(HttpMetrics::register(&registry, &cfg.http, &cfg.metrics)?)
        } else {
            None
        };
        let greet = GreetService::register(&registry)?;

        tracing::info!(
            metrics = registry.len(),
            http_instrumentation = cfg.http.enabled,
            cardinality_limit = registry.options().cardinality_limit,
            "metrics registry ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                http,
                greet,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn http_metrics(&self) -> Option<&HttpMetrics> {
        self.inner.http.as_ref()
    }

    pub fn greet(&self) -> &GreetService {
        &self.inner.greet
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
