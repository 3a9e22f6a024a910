//! # Fileshare API Server
//!
//! REST surface over a [`fileshare_session::Session`].
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and backend in use
//! - `GET /api/v1/account` - Active account and registration status
//! - `POST /api/v1/signup` - Register the active account
//! - `POST /api/v1/files?name=` - Publish the request body
//! - `GET /api/v1/files?owner=&q=` - List entries, optionally filtered
//! - `GET /api/v1/files/mine` - Entries recorded by the active account
//! - `GET /api/v1/files/:index` - One entry
//! - `POST /api/v1/catalog/refresh` - Rebuild the catalog
//! - `GET /api/v1/catalog/status` - Catalog snapshot metadata
//! - `GET /api/v1/content/:address` - Download stored bytes
//!
//! ## Example
//!
//! ```rust,ignore
//! use fileshare_api::{ApiConfig, ApiServer};
//!
//! let server = ApiServer::new(ApiConfig::from_env())?;
//! server.run(([0, 0, 0, 0], 3001)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use dto::{FileDto, FilesResponse, HealthResponse};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiConfig, AppState, DEFAULT_DEV_ACCOUNT, DEFAULT_MAX_UPLOAD_BYTES};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use fileshare_core::error::Result;

/// API server for Fileshare.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server, building the backends the configuration selects.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self::with_state(AppState::new(config)?))
    }

    /// Creates a server over prepared state.
    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.state.config.max_upload_bytes))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(backend = self.state.backend, "Fileshare API server listening on {}", addr);

        axum::serve(listener, self.router()).await
    }
}

/// Starts the API server with configuration from the environment.
pub async fn start_server(port: u16) -> std::io::Result<()> {
    let server = ApiServer::new(ApiConfig::from_env())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    server.run(([0, 0, 0, 0], port)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_upload_limit_enforced() {
        let config = ApiConfig {
            max_upload_bytes: 8,
            ..Default::default()
        };
        let router = ApiServer::new(config).unwrap().router();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/files?name=big.bin")
                    .body(Body::from(vec![7u8; 64]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
