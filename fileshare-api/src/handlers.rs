//! API route handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::{debug, info};

use fileshare_catalog::{CatalogQuery, CatalogStatus, RefreshOutcome};
use fileshare_core::types::{ContentAddress, Identity};
use fileshare_session::{AccountStatus, PublishReceipt, SignupOutcome};

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        backend: state.backend.into(),
    })
}

/// GET /api/v1/account
pub async fn get_account(State(state): State<Arc<AppState>>) -> Result<Json<AccountStatus>> {
    Ok(Json(state.session.connect().await?))
}

/// POST /api/v1/signup
pub async fn sign_up(State(state): State<Arc<AppState>>) -> Result<Json<SignupOutcome>> {
    let outcome = state.session.sign_up().await?;
    info!(?outcome, "Signup handled");
    Ok(Json(outcome))
}

/// POST /api/v1/files?name=...
///
/// The request body is the raw file content.
pub async fn publish_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PublishParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<PublishReceipt>)> {
    debug!(name = %params.name, len = body.len(), "Publish request");
    let receipt = state.session.publish(&params.name, &body).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/v1/files?owner=...&q=...
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<FilesResponse>> {
    let mut query = CatalogQuery::new();
    if let Some(owner) = params.owner.as_deref().filter(|o| !o.trim().is_empty()) {
        query = query.with_owner(Identity::new(owner)?);
    }
    if let Some(q) = params.q {
        query = query.with_name(q);
    }

    let outcome = state.session.query(&query).await;
    Ok(Json(FilesResponse::from_outcome(&outcome, &state.session)))
}

/// GET /api/v1/files/mine
pub async fn my_files(State(state): State<Arc<AppState>>) -> Result<Json<FilesResponse>> {
    let outcome = state.session.my_files().await?;
    Ok(Json(FilesResponse::from_outcome(&outcome, &state.session)))
}

/// GET /api/v1/files/:index
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(index): Path<u64>,
) -> Result<Json<FileDto>> {
    let entry = state.session.file(index).await?;
    Ok(Json(FileDto::from_entry(&entry, &state.session)))
}

/// POST /api/v1/catalog/refresh
pub async fn refresh_catalog(State(state): State<Arc<AppState>>) -> Result<Json<FilesResponse>> {
    let catalog = state.session.refresh().await?;
    let outcome = RefreshOutcome { catalog, error: None };
    Ok(Json(FilesResponse::from_outcome(&outcome, &state.session)))
}

/// GET /api/v1/catalog/status
pub async fn catalog_status(State(state): State<Arc<AppState>>) -> Json<CatalogStatus> {
    Json(state.session.catalog_status())
}

/// GET /api/v1/content/:address
pub async fn get_content(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse> {
    let address = ContentAddress::parse(&address)?;
    let bytes = state.session.fetch(&address).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
