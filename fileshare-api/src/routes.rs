//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Account
        .route("/api/v1/account", get(handlers::get_account))
        .route("/api/v1/signup", post(handlers::sign_up))

        // Files
        .route("/api/v1/files", get(handlers::list_files).post(handlers::publish_file))
        .route("/api/v1/files/mine", get(handlers::my_files))
        .route("/api/v1/files/:index", get(handlers::get_file))

        // Catalog
        .route("/api/v1/catalog/refresh", post(handlers::refresh_catalog))
        .route("/api/v1/catalog/status", get(handlers::catalog_status))

        // Content
        .route("/api/v1/content/:address", get(handlers::get_content))

        .with_state(state)
}
