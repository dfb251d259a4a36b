use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::Deserialize;

use promscope_core::error::{MetricsError, Result};
use promscope_core::histogram::DEFAULT_BUCKETS;
use promscope_core::labels::{is_valid_label_name, is_valid_metric_name};
use promscope_core::{Buckets, CardinalityScope, OverflowPolicy, RegistryOptions};

/// Labels the HTTP middleware always sets; custom tags may not reuse them.
pub const BUILTIN_HTTP_LABELS: [&str; 3] = ["method", "route", "status"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub http: HttpSection,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::UnsupportedVersion);
        }
        self.server.validate()?;
        self.metrics.validate()?;
        self.http.validate()?;
        Ok(())
    }
}

// --------------------
// server
// --------------------
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_scrape_path")]
    pub scrape_path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            scrape_path: default_scrape_path(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen.parse::<SocketAddr>().map_err(|_| {
            MetricsError::BadConfig(format!(
                "server.listen is not a socket address: {}",
                self.listen
            ))
        })?;
        if !self.scrape_path.starts_with('/') || self.scrape_path.len() < 2 {
            return Err(MetricsError::BadConfig(
                "server.scrape_path must start with '/' and name a path".into(),
            ));
        }
        if ["/healthz", "/readyz", "/", "/hello"].contains(&self.scrape_path.as_str()) {
            return Err(MetricsError::BadConfig(format!(
                "server.scrape_path {} collides with a built-in route",
                self.scrape_path
            )));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:9100".into()
}
fn default_scrape_path() -> String {
    "/metrics".into()
}

// --------------------
// metrics
// --------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityScopeConfig {
    #[default]
    PerMetric,
    Registry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowConfig {
    #[default]
    Reject,
    Fold,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default = "default_cardinality_limit")]
    pub cardinality_limit: usize,

    #[serde(default)]
    pub cardinality_scope: CardinalityScopeConfig,

    #[serde(default = "default_registry_cardinality_limit")]
    pub registry_cardinality_limit: usize,

    #[serde(default)]
    pub overflow: OverflowConfig,

    #[serde(default = "default_overflow_value")]
    pub overflow_value: String,

    #[serde(default = "default_true")]
    pub count_errors: bool,

    /// Bucket overrides by (un-namespaced) histogram name.
    #[serde(default)]
    pub histograms: BTreeMap<String, Vec<f64>>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            namespace: None,
            cardinality_limit: default_cardinality_limit(),
            cardinality_scope: CardinalityScopeConfig::default(),
            registry_cardinality_limit: default_registry_cardinality_limit(),
            overflow: OverflowConfig::default(),
            overflow_value: default_overflow_value(),
            count_errors: true,
            histograms: BTreeMap::new(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(ns) = &self.namespace {
            if !is_valid_metric_name(ns) {
                return Err(MetricsError::BadConfig(format!(
                    "metrics.namespace is not a valid metric name: {ns}"
                )));
            }
        }
        if !(1..=1_000_000).contains(&self.cardinality_limit) {
            return Err(MetricsError::BadConfig(
                "metrics.cardinality_limit must be between 1 and 1000000".into(),
            ));
        }
        if self.cardinality_scope == CardinalityScopeConfig::Registry
            && self.registry_cardinality_limit == 0
        {
            return Err(MetricsError::BadConfig(
                "metrics.registry_cardinality_limit must be at least 1".into(),
            ));
        }
        if self.overflow_value.is_empty() {
            return Err(MetricsError::BadConfig(
                "metrics.overflow_value must not be empty".into(),
            ));
        }
        for (name, bounds) in &self.histograms {
            Buckets::new(bounds.clone()).map_err(|e| {
                MetricsError::BadConfig(format!("metrics.histograms.{name}: {e}"))
            })?;
        }
        Ok(())
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            namespace: self.namespace.clone(),
            cardinality_limit: self.cardinality_limit,
            cardinality_scope: match self.cardinality_scope {
                CardinalityScopeConfig::PerMetric => CardinalityScope::PerMetric,
                CardinalityScopeConfig::Registry => CardinalityScope::Registry {
                    limit: self.registry_cardinality_limit,
                },
            },
            overflow: match self.overflow {
                OverflowConfig::Reject => OverflowPolicy::Reject,
                OverflowConfig::Fold => OverflowPolicy::Fold {
                    value: self.overflow_value.clone(),
                },
            },
            count_errors: self.count_errors,
        }
    }

    /// Configured buckets for `name`, or `fallback`.
    pub fn buckets_for(&self, name: &str, fallback: Buckets) -> Result<Buckets> {
        match self.histograms.get(name) {
            Some(bounds) => Buckets::new(bounds.clone()),
            None => Ok(fallback),
        }
    }
}

fn default_cardinality_limit() -> usize {
    500
}
fn default_registry_cardinality_limit() -> usize {
    10_000
}
fn default_overflow_value() -> String {
    "other".into()
}
fn default_true() -> bool {
    true
}

// --------------------
// http
// --------------------
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Custom per-request tag keys that become labels. Others are ignored.
    #[serde(default)]
    pub tag_keys: Vec<String>,

    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            enabled: true,
            tag_keys: Vec::new(),
            duration_buckets: default_duration_buckets(),
        }
    }
}

impl HttpSection {
    pub fn validate(&self) -> Result<()> {
        for k in &self.tag_keys {
            if !is_valid_label_name(k) || k.starts_with("__") || k == "le" {
                return Err(MetricsError::BadConfig(format!("http.tag_keys: bad label name {k:?}")));
            }
            if BUILTIN_HTTP_LABELS.contains(&k.as_str()) {
                return Err(MetricsError::BadConfig(format!(
                    "http.tag_keys: {k} is set by the server"
                )));
            }
        }
        Buckets::new(self.duration_buckets.clone())
            .map_err(|e| MetricsError::BadConfig(format!("http.duration_buckets: {e}")))?;
        Ok(())
    }
}

fn default_duration_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}
