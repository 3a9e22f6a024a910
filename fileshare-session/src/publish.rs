//! Two-phase publish: store the bytes, then record the entry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use fileshare_catalog::CatalogCache;
use fileshare_core::error::{FileshareError, Result};
use fileshare_core::traits::{ContentStore, RegistryClient};
use fileshare_core::types::{ContentAddress, FileEntry, Identity, TransactionReceipt};

use crate::state::{FailureReason, PublishState};

/// Callback invoked on every state transition.
pub type StateObserver = Arc<dyn Fn(&PublishState) + Send + Sync>;

/// Outcome of a successful publish.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Attempt id, also recorded on the tracing span
    pub attempt_id: Uuid,
    /// Name as recorded
    pub name: String,
    /// Content address of the bytes
    pub address: ContentAddress,
    /// Ledger transaction
    pub transaction: TransactionReceipt,
    /// The new entry, if the follow-up refresh found it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<FileEntry>,
    /// Follow-up refresh failure; the entry is recorded regardless
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
    /// When the entry was recorded
    pub completed_at: DateTime<Utc>,
}

/// Orders the publish side effects and enforces one attempt at a time.
///
/// The registration gate runs before any write, the content store write
/// completes before the ledger write starts, and a ledger failure leaves the
/// stored bytes in place. Nothing is retried.
///
/// Once `Recording` starts the ledger write runs on its own task. Dropping
/// the caller's future after that point does not free the slot; it stays
/// taken until the submitted write and the follow-up refresh finish.
pub struct PublishCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    registry: Arc<dyn RegistryClient>,
    store: Arc<dyn ContentStore>,
    catalog: Arc<CatalogCache>,
    in_flight: AtomicBool,
    state: RwLock<PublishState>,
    observer: RwLock<Option<StateObserver>>,
}

/// Owns the publish slot. A slot dropped before reaching a terminal state
/// falls back to `Idle`.
struct PublishSlot {
    inner: Arc<CoordinatorInner>,
}

impl Drop for PublishSlot {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.write();
            if state.is_active() {
                debug!(state = %*state, "Publish attempt abandoned");
                *state = PublishState::Idle;
            }
        }
        self.inner.in_flight.store(false, Ordering::SeqCst);
    }
}

impl PublishCoordinator {
    /// Creates a coordinator.
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        store: Arc<dyn ContentStore>,
        catalog: Arc<CatalogCache>,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                registry,
                store,
                catalog,
                in_flight: AtomicBool::new(false),
                state: RwLock::new(PublishState::Idle),
                observer: RwLock::new(None),
            }),
        }
    }

    /// Registers a transition callback.
    pub fn with_observer(self, observer: StateObserver) -> Self {
        *self.inner.observer.write() = Some(observer);
        self
    }

    /// Current state.
    pub fn state(&self) -> PublishState {
        self.inner.state.read().clone()
    }

    /// True while an attempt is running.
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Publishes `bytes` under `name` on behalf of `caller`.
    ///
    /// Fails fast with `PublishInProgress` if another attempt is running;
    /// that attempt's state is left untouched. Must be called from within a
    /// tokio runtime.
    pub async fn publish(&self, caller: &Identity, name: &str, bytes: &[u8]) -> Result<PublishReceipt> {
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FileshareError::PublishInProgress);
        }
        let slot = PublishSlot {
            inner: self.inner.clone(),
        };

        let attempt_id = Uuid::new_v4();
        let span = info_span!("publish", %attempt_id, %caller, file = name, len = bytes.len());

        async move {
            let address = match self.inner.prepare(caller, name, bytes).await {
                Ok(address) => address,
                Err(e) => {
                    self.inner.fail(&e);
                    return Err(e);
                }
            };

            self.inner.transition(PublishState::Recording {
                address: address.clone(),
            });

            let inner = self.inner.clone();
            let caller = caller.clone();
            let name = name.to_string();
            let recording = tokio::spawn(
                async move {
                    let _slot = slot;
                    let result = inner.record(attempt_id, &caller, &name, address).await;
                    if let Err(e) = &result {
                        inner.fail(e);
                    }
                    result
                }
                .in_current_span(),
            );

            recording
                .await
                .map_err(|e| FileshareError::InternalError(format!("recording task failed: {}", e)))?
        }
        .instrument(span)
        .await
    }
}

impl CoordinatorInner {
    /// `Validating` and `Storing`. Returns the address of the stored bytes.
    async fn prepare(&self, caller: &Identity, name: &str, bytes: &[u8]) -> Result<ContentAddress> {
        self.transition(PublishState::Validating);
        if name.trim().is_empty() {
            return Err(FileshareError::EmptyName);
        }
        if bytes.is_empty() {
            return Err(FileshareError::EmptyContent);
        }
        if !self.registry.is_registered(caller).await? {
            return Err(FileshareError::NotRegistered(caller.to_string()));
        }

        self.transition(PublishState::Storing);
        let address = self.store.put(bytes).await.map_err(|e| match e {
            FileshareError::StoreUnavailable(_) => e,
            other => FileshareError::StoreUnavailable(other.to_string()),
        })?;
        debug!(%address, "Bytes stored");
        Ok(address)
    }

    /// `Recording` through `Done`, plus the follow-up refresh.
    async fn record(
        &self,
        attempt_id: Uuid,
        caller: &Identity,
        name: &str,
        address: ContentAddress,
    ) -> Result<PublishReceipt> {
        let transaction = self.registry.add_file(caller, name, &address).await?;

        self.transition(PublishState::Done {
            address: address.clone(),
            tx_hash: transaction.tx_hash.clone(),
        });
        info!(%address, tx_hash = %transaction.tx_hash, "Entry recorded");

        let (entry, refresh_error) = match self.catalog.refresh().await {
            Ok(catalog) => {
                let entry = catalog
                    .iter()
                    .rev()
                    .find(|e| &e.owner == caller && e.address == address && e.name == name)
                    .cloned();
                (entry, None)
            }
            Err(e) => {
                warn!(error = %e, "Catalog refresh after publish failed");
                (None, Some(e.to_string()))
            }
        };

        Ok(PublishReceipt {
            attempt_id,
            name: name.to_string(),
            address,
            transaction,
            entry,
            refresh_error,
            completed_at: Utc::now(),
        })
    }

    fn fail(&self, error: &FileshareError) {
        warn!(error = %error, "Publish failed");
        self.transition(PublishState::Failed {
            reason: FailureReason::from(error),
        });
    }

    fn transition(&self, next: PublishState) {
        debug!(state = %next, "Publish state");
        *self.state.write() = next.clone();
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer(&next);
        }
    }
}
