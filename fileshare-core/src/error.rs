//! Error types for Fileshare.
//!
//! One error enum covers every component. Variants are grouped by the
//! collaborator that produces them so callers can classify a failure with
//! [`FileshareError::kind`] without matching every variant.

use thiserror::Error;

/// Result type alias using `FileshareError`.
pub type Result<T> = std::result::Result<T, FileshareError>;

/// Main error type for all Fileshare operations.
#[derive(Debug, Error)]
pub enum FileshareError {
    // ═══════════════════════════════════════════════════════════════════════════
    // IDENTITY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// No identity provider is reachable, or it exposes no account.
    #[error("No identity provider available: {0}")]
    NoProvider(String),

    /// The user declined to sign a transaction.
    #[error("User rejected the signature request")]
    UserRejected,

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The calling identity is not registered on the ledger.
    #[error("Identity is not registered: {0}")]
    NotRegistered(String),

    /// The identity is already registered on the ledger.
    #[error("Identity is already registered: {0}")]
    AlreadyRegistered(String),

    /// A file index outside `1..=count` was requested.
    #[error("File index {index} out of range (file count is {count})")]
    IndexOutOfRange {
        /// Requested index
        index: u64,
        /// File count at the time of the request
        count: u64,
    },

    /// The connection to a remote system was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A remote system did not answer in time.
    #[error("Timed out: {0}")]
    Timeout(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONTENT STORE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The content store could not durably store the bytes.
    #[error("Content store unavailable: {0}")]
    StoreUnavailable(String),

    /// No content is stored under the address.
    #[error("Content not found: {0}")]
    NotFound(String),

    /// A content address failed validation.
    #[error("Invalid content address: {0}")]
    InvalidContentAddress(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File name is empty after trimming.
    #[error("File name cannot be empty")]
    EmptyName,

    /// File content is empty.
    #[error("File content cannot be empty")]
    EmptyContent,

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONCURRENCY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Another publish is already in flight for this session.
    #[error("A publish is already in progress")]
    PublishInProgress,

    // ═══════════════════════════════════════════════════════════════════════════
    // PROTOCOL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The JSON-RPC node returned an error object.
    #[error("RPC error {code}: {message}")]
    RpcError {
        /// JSON-RPC error code
        code: i64,
        /// Node-supplied message
        message: String,
    },

    /// A response could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A refreshed catalog violated index contiguity.
    #[error("Catalog integrity violation: {0}")]
    CatalogIntegrity(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION & INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Coarse classification of a [`FileshareError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wallet / identity provider failures.
    Identity,
    /// Ledger contract failures.
    Registry,
    /// Content store failures.
    Store,
    /// Rejected input.
    Validation,
    /// Session concurrency guard.
    Concurrency,
    /// Wire-level or decoding failures.
    Protocol,
    /// Misconfiguration.
    Config,
    /// Broken invariants.
    Internal,
}

impl FileshareError {
    /// Returns the error's taxonomy group.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileshareError::NoProvider(_) | FileshareError::UserRejected => ErrorKind::Identity,
            FileshareError::NotRegistered(_)
            | FileshareError::AlreadyRegistered(_)
            | FileshareError::IndexOutOfRange { .. }
            | FileshareError::ConnectionLost(_)
            | FileshareError::Timeout(_) => ErrorKind::Registry,
            FileshareError::StoreUnavailable(_)
            | FileshareError::NotFound(_)
            | FileshareError::InvalidContentAddress(_) => ErrorKind::Store,
            FileshareError::EmptyName
            | FileshareError::EmptyContent
            | FileshareError::ValidationError(_) => ErrorKind::Validation,
            FileshareError::PublishInProgress => ErrorKind::Concurrency,
            FileshareError::RpcError { .. }
            | FileshareError::InvalidResponse(_)
            | FileshareError::CatalogIntegrity(_)
            | FileshareError::JsonError(_)
            | FileshareError::HexError(_) => ErrorKind::Protocol,
            FileshareError::ConfigError(_) => ErrorKind::Config,
            FileshareError::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the caller may retry the operation.
    ///
    /// The core itself never retries; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FileshareError::ConnectionLost(_)
                | FileshareError::Timeout(_)
                | FileshareError::StoreUnavailable(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Short machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            FileshareError::NoProvider(_) => "NO_PROVIDER",
            FileshareError::UserRejected => "USER_REJECTED",
            FileshareError::NotRegistered(_) => "NOT_REGISTERED",
            FileshareError::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            FileshareError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            FileshareError::ConnectionLost(_) => "CONNECTION_LOST",
            FileshareError::Timeout(_) => "TIMEOUT",
            FileshareError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            FileshareError::NotFound(_) => "NOT_FOUND",
            FileshareError::InvalidContentAddress(_) => "INVALID_CONTENT_ADDRESS",
            FileshareError::EmptyName => "EMPTY_NAME",
            FileshareError::EmptyContent => "EMPTY_CONTENT",
            FileshareError::ValidationError(_) => "VALIDATION_ERROR",
            FileshareError::PublishInProgress => "PUBLISH_IN_PROGRESS",
            FileshareError::RpcError { .. } => "RPC_ERROR",
            FileshareError::InvalidResponse(_) => "INVALID_RESPONSE",
            FileshareError::CatalogIntegrity(_) => "CATALOG_INTEGRITY",
            FileshareError::JsonError(_) => "JSON_ERROR",
            FileshareError::HexError(_) => "HEX_ERROR",
            FileshareError::ConfigError(_) => "CONFIG_ERROR",
            FileshareError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}
