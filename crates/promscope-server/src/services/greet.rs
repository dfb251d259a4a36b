//! Greeting routes.
//!
//! `/hello?name=...` copies the query value into a request tag. Left
//! unchecked, a tag like that grows one label set per distinct caller input;
//! the registry ceiling (and `overflow: fold`) is what keeps it bounded.

use axum::extract::{Query, State};
use axum::Extension;
use serde::Deserialize;

use promscope_core::error::Result;
use promscope_core::{Counter, LabelSet, Registry};

use crate::app_state::AppState;
use crate::context::RequestTags;

pub const GREETINGS_TOTAL: &str = "greetings_total";

const DEFAULT_NAME: &str = "world";

/// Application-level metric owned by the greeting routes.
pub struct GreetService {
    greetings: Counter,
}

impl GreetService {
    pub fn register(registry: &Registry) -> Result<Self> {
        Ok(Self {
            greetings: registry.counter(GREETINGS_TOTAL, "Greetings served, by name.")?,
        })
    }

    pub fn greet(&self, name: &str) -> String {
        if let Err(e) = self.greetings.inc(&LabelSet::from_pairs(&[("name", name)])) {
            tracing::debug!(error = %e, "greeting not counted");
        }
        format!("Hello, {name}!")
    }

    /// Greetings recorded for `name`.
    pub fn count(&self, name: &str) -> f64 {
        self.greetings.get(&LabelSet::from_pairs(&[("name", name)]))
    }
}

#[derive(Debug, Deserialize)]
pub struct HelloQuery {
    #[serde(default)]
    pub name: Option<String>,
}

pub async fn index() -> &'static str {
    "promscope demo: try /hello?name=you, then scrape the metrics path"
}

pub async fn hello(
    State(state): State<AppState>,
    tags: Option<Extension<RequestTags>>,
    Query(q): Query<HelloQuery>,
) -> String {
    let name = q
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    if let Some(Extension(tags)) = tags {
        tags.insert("name", name.as_str());
    }
    state.greet().greet(&name)
}
