//! HTTP router construction.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/jobs", get(api::jobs_list).post(api::jobs_create))
        .route("/api/jobs/{id}", get(api::jobs_get))
        .route("/api/topics", get(api::topics_list))
        .route("/api/topics/{id}/select", post(api::topics_select))
        .route("/api/scripts", get(api::scripts_list))
        .route("/api/scripts/{id}", get(api::scripts_get))
        .route(
            "/api/sources",
            get(api::sources_list).post(api::sources_create),
        )
        .route(
            "/api/sources/{id}",
            axum::routing::delete(api::sources_delete),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
