//! Axum router construction.

mod downloads;
mod health;
mod reports;
mod sienge;

use std::sync::Arc;

use axum::{middleware, Router};

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Builds the full application router with CORS and request logging.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/reports", reports::router())
        .nest("/api/sienge", sienge::router())
        .nest("/downloads", downloads::router())
        .layer(cors::cors_layer())
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
