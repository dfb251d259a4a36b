//! HTTP request metrics.
//!
//! Every request is counted in `http_requests_total` and timed in
//! `http_request_duration_seconds`, labelled by method, matched route
//! template and status code, plus any allowlisted custom tags the handlers
//! attached. Recording failures (cardinality, bad input) are logged and
//! counted by the registry; they never fail the request.

use std::time::Duration;

use promscope_core::error::Result;
use promscope_core::{Buckets, Counter, Histogram, LabelSet, Registry};

use crate::config::{HttpSection, MetricsSection};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

pub struct HttpMetrics {
    requests: Counter,
    duration: Histogram,
    tag_keys: Vec<String>,
}

impl HttpMetrics {
    pub fn register(
        registry: &Registry,
        http: &HttpSection,
        metrics: &MetricsSection,
    ) -> Result<Self> {
        let fallback = Buckets::new(http.duration_buckets.clone())?;
        let buckets = metrics.buckets_for(REQUEST_DURATION, fallback)?;

        Ok(Self {
            requests: registry.counter(REQUESTS_TOTAL, "Total HTTP requests handled.")?,
            duration: registry.histogram(
                REQUEST_DURATION,
                "HTTP request latency in seconds.",
                buckets,
            )?,
            tag_keys: http.tag_keys.clone(),
        })
    }

    /// Build the label set for one finished request.
    pub fn labels(
        &self,
        method: &str,
        route: &str,
        status: u16,
        tags: &[(String, String)],
    ) -> LabelSet {
        let status = status.to_string();
        let mut labels = LabelSet::from_pairs(&[
            ("method", method),
            ("route", route),
            ("status", status.as_str()),
        ]);
        for (k, v) in tags {
            if self.tag_keys.iter().any(|allowed| allowed == k) {
                labels.insert(k.as_str(), v.as_str());
            }
        }
        labels
    }

    pub fn record(
        &self,
        method: &str,
        route: &str,
        status: u16,
        tags: &[(String, String)],
        elapsed: Duration,
    ) {
        let labels = self.labels(method, route, status, tags);
        if let Err(e) = self.requests.inc(&labels) {
            tracing::debug!(error = %e, %route, "request not counted");
        }
        if let Err(e) = self.duration.observe_duration(&labels, elapsed) {
            tracing::debug!(error = %e, %route, "request latency not recorded");
        }
    }

    pub fn requests(&self) -> &Counter {
        &self.requests
    }

    pub fn duration(&self) -> &Histogram {
        &self.duration
    }
}
