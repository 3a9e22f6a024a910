//! Rebuildable in-memory index over the ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use fileshare_core::constants::{DEFAULT_FETCH_CONCURRENCY, MAX_FETCH_CONCURRENCY};
use fileshare_core::error::{FileshareError, Result};
use fileshare_core::traits::RegistryClient;
use fileshare_core::types::Catalog;

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Maximum `get_file` calls in flight during a refresh
    pub fetch_concurrency: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

impl CatalogConfig {
    /// Sets the fetch concurrency, clamped to `1..=MAX_FETCH_CONCURRENCY`.
    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.clamp(1, MAX_FETCH_CONCURRENCY);
        self
    }
}

#[derive(Default)]
struct CacheState {
    snapshot: Arc<Catalog>,
    refreshed_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    refreshes: u64,
    failures: u64,
}

/// Snapshot metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStatus {
    /// Entries in the current snapshot
    pub entries: usize,
    /// Highest index in the snapshot
    pub last_index: Option<u64>,
    /// When the snapshot was last replaced
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Error from the most recent failed refresh, cleared on success
    pub last_error: Option<String>,
    /// True if never refreshed or the most recent refresh failed
    pub stale: bool,
    /// Successful refreshes
    pub refreshes: u64,
    /// Failed refreshes
    pub failures: u64,
}

/// Result of [`CatalogCache::refresh_or_stale`].
#[derive(Debug)]
pub struct RefreshOutcome {
    /// Fresh snapshot, or the previous one if the refresh failed
    pub catalog: Arc<Catalog>,
    /// The refresh failure, if any
    pub error: Option<FileshareError>,
}

impl RefreshOutcome {
    /// True if `catalog` is the previous snapshot.
    pub fn is_stale(&self) -> bool {
        self.error.is_some()
    }
}

/// Process-wide catalog cache with an explicit refresh lifecycle.
///
/// A refresh reads `file_count()` once, fetches `1..=count` and replaces the
/// snapshot wholesale. Entries appended after the count read show up on the
/// next refresh. Refreshes are read-only and may overlap; whichever finishes
/// last sets the snapshot.
pub struct CatalogCache {
    registry: Arc<dyn RegistryClient>,
    config: CatalogConfig,
    state: RwLock<CacheState>,
}

impl CatalogCache {
    /// Creates a cache with default configuration.
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self::with_config(registry, CatalogConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(registry: Arc<dyn RegistryClient>, config: CatalogConfig) -> Self {
        Self {
            registry,
            config,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Rebuilds the catalog from the ledger and replaces the snapshot.
    ///
    /// On failure the previous snapshot stays in place and the error is
    /// recorded in [`status`](Self::status).
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<Catalog>> {
        match self.fetch_all().await {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                let mut state = self.state.write();
                state.snapshot = catalog.clone();
                state.refreshed_at = Some(Utc::now());
                state.last_error = None;
                state.refreshes += 1;
                info!(entries = catalog.len(), "Catalog refreshed");
                Ok(catalog)
            }
            Err(e) => {
                let mut state = self.state.write();
                state.last_error = Some(e.to_string());
                state.failures += 1;
                warn!(error = %e, "Catalog refresh failed");
                Err(e)
            }
        }
    }

    /// Refreshes, falling back to the previous snapshot on failure.
    pub async fn refresh_or_stale(&self) -> RefreshOutcome {
        match self.refresh().await {
            Ok(catalog) => RefreshOutcome { catalog, error: None },
            Err(error) => RefreshOutcome {
                catalog: self.snapshot(),
                error: Some(error),
            },
        }
    }

    /// Current snapshot, without touching the ledger.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.state.read().snapshot.clone()
    }

    /// Snapshot metadata.
    pub fn status(&self) -> CatalogStatus {
        let state = self.state.read();
        CatalogStatus {
            entries: state.snapshot.len(),
            last_index: state.snapshot.last_index(),
            refreshed_at: state.refreshed_at,
            last_error: state.last_error.clone(),
            stale: state.refreshed_at.is_none() || state.last_error.is_some(),
            refreshes: state.refreshes,
            failures: state.failures,
        }
    }

    async fn fetch_all(&self) -> Result<Catalog> {
        let count = self.registry.file_count().await?;
        let concurrency = self.config.fetch_concurrency.clamp(1, MAX_FETCH_CONCURRENCY);
        debug!(count, concurrency, "Fetching entries");

        let registry = &self.registry;
        let entries: Vec<_> = stream::iter(1..=count)
            .map(|index| registry.get_file(index))
            .buffered(concurrency)
            .try_collect()
            .await?;

        let catalog = Catalog::from_entries(entries);
        catalog.verify_contiguous()?;
        Ok(catalog)
    }
}
