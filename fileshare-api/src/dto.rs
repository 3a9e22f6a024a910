//! DTOs for API requests and responses.

use serde::{Deserialize, Serialize};

use fileshare_catalog::RefreshOutcome;
use fileshare_core::types::FileEntry;
use fileshare_session::Session;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Crate version
    pub version: String,
    /// Ledger backend in use ("memory" or "contract")
    pub backend: String,
}

/// Query string for `POST /api/v1/files`.
#[derive(Debug, Deserialize)]
pub struct PublishParams {
    /// Display name for the uploaded bytes
    pub name: String,
}

/// Query string for `GET /api/v1/files`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Restrict to entries recorded by this identity
    pub owner: Option<String>,
    /// Restrict to names containing this substring (case-insensitive)
    pub q: Option<String>,
}

/// A file entry with its public locator.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileDto {
    /// Ledger index
    pub index: u64,
    /// Uploader identity
    pub owner: String,
    /// Display name
    pub name: String,
    /// Content address
    pub address: String,
    /// Gateway URL, when the store has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileDto {
    /// Builds the DTO, resolving the locator through the session's store.
    pub fn from_entry(entry: &FileEntry, session: &Session) -> Self {
        Self {
            index: entry.index,
            owner: entry.owner.to_string(),
            name: entry.name.clone(),
            address: entry.address.to_string(),
            url: session.locator(&entry.address),
        }
    }
}

/// A catalog listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilesResponse {
    /// Entries in index order
    pub files: Vec<FileDto>,
    /// Number of entries returned
    pub count: usize,
    /// True if the ledger could not be read and the listing is the last
    /// good snapshot
    pub stale: bool,
    /// Read failure, when stale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FilesResponse {
    /// Builds a listing from a refresh outcome.
    pub fn from_outcome(outcome: &RefreshOutcome, session: &Session) -> Self {
        let files: Vec<FileDto> = outcome
            .catalog
            .iter()
            .map(|e| FileDto::from_entry(e, session))
            .collect();
        Self {
            count: files.len(),
            files,
            stale: outcome.is_stale(),
            error: outcome.error.as_ref().map(|e| e.to_string()),
        }
    }
}
