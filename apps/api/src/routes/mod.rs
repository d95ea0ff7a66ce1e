pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::layout::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Stateless engine API
        .route("/api/v1/layout/decompose", post(handlers::handle_decompose))
        .route("/api/v1/layout/heights", post(handlers::handle_heights))
        .route("/api/v1/layout/assign", post(handlers::handle_assign))
        .route("/api/v1/layout/validate", post(handlers::handle_validate))
        .route("/api/v1/layout/paginate", post(handlers::handle_paginate))
        // Live preview sessions
        .route("/api/v1/previews", post(handlers::handle_create_preview))
        .route(
            "/api/v1/previews/:id",
            get(handlers::handle_get_preview).delete(handlers::handle_delete_preview),
        )
        .route(
            "/api/v1/previews/:id/document",
            put(handlers::handle_submit_document),
        )
        .route(
            "/api/v1/previews/:id/events",
            get(handlers::handle_preview_events),
        )
        .route(
            "/api/v1/previews/:id/export",
            get(handlers::handle_export_preview),
        )
        .with_state(state)
}
