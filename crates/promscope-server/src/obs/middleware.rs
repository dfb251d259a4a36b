//! Axum middleware recording `HttpMetrics` per request.

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::time::Instant;

use crate::app_state::AppState;
use crate::context::RequestTags;

/// Route label for requests that matched no route (keeps 404 scans from
/// minting one label set per scanned path).
pub const UNMATCHED_ROUTE: &str = "unmatched";

pub async fn track_requests(State(app): State<AppState>, mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());

    let tags = RequestTags::new();
    req.extensions_mut().insert(tags.clone());

    let resp = next.run(req).await;

    if let Some(http) = app.http_metrics() {
        http.record(
            &method,
            &route,
            resp.status().as_u16(),
            &tags.pairs(),
            start.elapsed(),
        );
    }
    resp
}
