//! Axum router wiring.
//!
//! Demo routes, ops endpoints, and the configured scrape path. When HTTP
//! instrumentation is enabled every route is wrapped by `track_requests`.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, obs, ops, services};

pub fn build_router(state: AppState) -> Router {
    let scrape_path = state.cfg().server.scrape_path.clone();

    let mut app = Router::new()
        .route("/", get(services::greet::index))
        .route("/hello", get(services::greet::hello))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route(&scrape_path, get(ops::metrics));

    if state.http_metrics().is_some() {
        app = app.layer(middleware::from_fn_with_state(
            state.clone(),
            obs::middleware::track_requests,
        ));
    }

    app.with_state(state)
}
