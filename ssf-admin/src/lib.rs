//! ssf-admin library: HTTP administration service for the shelter severity
//! framework (pillars, themes, sub-themes, standards, indicators)

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

/// Upload limit for CSV imports
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Name of the cookie carrying the caller's role
    pub role_cookie: Arc<str>,
}

impl AppState {
    pub fn new(db: SqlitePool, role_cookie: impl Into<Arc<str>>) -> Self {
        Self {
            db,
            role_cookie: role_cookie.into(),
        }
    }
}

/// Build application router
///
/// Every route passes through the role middleware; only `super-admin`
/// callers get past it with a mutating request.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/import/:table", post(api::import_table))
        .route("/api/export/combined.csv", get(api::export_combined))
        .route("/api/export/framework.csv", get(api::export_framework))
        .merge(api::entity_routes())
        .merge(api::framework_routes())
        .merge(api::health_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::role_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
