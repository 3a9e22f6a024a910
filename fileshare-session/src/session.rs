//! Per-account session over the three external systems.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use fileshare_catalog::{filter_by_owner, CatalogCache, CatalogConfig, CatalogQuery, CatalogStatus, RefreshOutcome};
use fileshare_core::error::{FileshareError, Result};
use fileshare_core::traits::{ContentStore, IdentityProvider, RegistryClient};
use fileshare_core::types::{Catalog, ContentAddress, FileEntry, Identity, IdentityEvent};

use crate::publish::{PublishCoordinator, PublishReceipt, StateObserver};
use crate::signup::{SignupFlow, SignupOutcome};
use crate::state::{PublishState, SignupState};

/// Active account and its registration status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    /// Active identity
    pub identity: Identity,
    /// Registration as last read from the ledger
    pub registered: bool,
}

/// Session settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Catalog cache settings
    pub catalog: CatalogConfig,
}

/// One user's view of the system.
///
/// The session tracks the active account, caches its registration status,
/// owns the publish slot and exposes the catalog queries. Writes go through
/// [`PublishCoordinator`] and [`SignupFlow`]; reads never fail the session,
/// they return the last good snapshot plus the error.
pub struct Session {
    identity: Arc<dyn IdentityProvider>,
    registry: Arc<dyn RegistryClient>,
    store: Arc<dyn ContentStore>,
    catalog: Arc<CatalogCache>,
    coordinator: PublishCoordinator,
    signup: SignupFlow,
    account: RwLock<Option<AccountStatus>>,
    /// Bumped on every account switch; written only under the `account` lock
    epoch: AtomicU64,
}

impl Session {
    /// Creates a session with default settings.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        registry: Arc<dyn RegistryClient>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self::with_config(identity, registry, store, SessionConfig::default(), None)
    }

    /// Creates a session with custom settings and an optional publish
    /// state observer.
    pub fn with_config(
        identity: Arc<dyn IdentityProvider>,
        registry: Arc<dyn RegistryClient>,
        store: Arc<dyn ContentStore>,
        config: SessionConfig,
        observer: Option<StateObserver>,
    ) -> Self {
        let catalog = Arc::new(CatalogCache::with_config(registry.clone(), config.catalog));
        let mut coordinator = PublishCoordinator::new(registry.clone(), store.clone(), catalog.clone());
        if let Some(observer) = observer {
            coordinator = coordinator.with_observer(observer);
        }

        Self {
            signup: SignupFlow::new(registry.clone()),
            identity,
            registry,
            store,
            catalog,
            coordinator,
            account: RwLock::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCOUNT
    // ═══════════════════════════════════════════════════════════════════════

    /// Reads the active account from the provider and checks registration.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<AccountStatus> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let identity = self
            .identity
            .active_account()
            .await?
            .ok_or_else(|| FileshareError::NoProvider("no active account".into()))?;
        self.check_registration(identity, epoch).await
    }

    /// Cached account status, if connected.
    pub fn account(&self) -> Option<AccountStatus> {
        self.account.read().clone()
    }

    /// The active identity, connecting first if needed.
    pub async fn active_identity(&self) -> Result<Identity> {
        if let Some(status) = self.account() {
            return Ok(status.identity);
        }
        Ok(self.connect().await?.identity)
    }

    async fn check_registration(&self, identity: Identity, epoch: u64) -> Result<AccountStatus> {
        let registered = self.registry.is_registered(&identity).await?;
        let status = AccountStatus { identity, registered };
        if self.cache_account(&status, epoch) {
            debug!(identity = %status.identity, registered, "Account status");
        }
        Ok(status)
    }

    /// Caches `status` unless the account switched since `epoch` was read.
    fn cache_account(&self, status: &AccountStatus, epoch: u64) -> bool {
        let mut account = self.account.write();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(identity = %status.identity, "Account switched, not caching stale status");
            return false;
        }
        *account = Some(status.clone());
        true
    }

    /// Drops the cached account and returns the new epoch.
    fn forget_account(&self) -> u64 {
        let mut account = self.account.write();
        *account = None;
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Applies a provider event.
    ///
    /// An account switch drops the cached status and re-runs the
    /// registration check for the new account.
    pub async fn handle_event(&self, event: IdentityEvent) -> Result<Option<AccountStatus>> {
        match event {
            IdentityEvent::AccountChanged(identity) => {
                info!(%identity, "Active account changed");
                let epoch = self.forget_account();
                self.signup.reset();
                self.check_registration(identity, epoch).await.map(Some)
            }
            IdentityEvent::Disconnected => {
                info!("Identity provider disconnected");
                self.forget_account();
                self.signup.reset();
                Ok(None)
            }
        }
    }

    /// Applies events until the provider's channel closes.
    ///
    /// Failed registration checks are logged and the loop continues. If
    /// events were dropped the session reconnects from scratch.
    pub async fn watch(&self, mut events: broadcast::Receiver<IdentityEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(e) = self.handle_event(event).await {
                        warn!(error = %e, "Registration check after account event failed");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed identity events, reconnecting");
                    self.forget_account();
                    if let Err(e) = self.connect().await {
                        warn!(error = %e, "Reconnect failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Identity event channel closed");
                    return;
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // WRITES
    // ═══════════════════════════════════════════════════════════════════════

    /// Registers the active account.
    ///
    /// If the account switches while the transaction is pending, the
    /// registration still stands but the new account's cached status is kept.
    pub async fn sign_up(&self) -> Result<SignupOutcome> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let identity = self.active_identity().await?;
        let outcome = self.signup.sign_up(&identity).await?;
        let status = AccountStatus {
            identity,
            registered: true,
        };
        self.cache_account(&status, epoch);
        Ok(outcome)
    }

    /// Publishes `bytes` under `name` as the active account.
    pub async fn publish(&self, name: &str, bytes: &[u8]) -> Result<PublishReceipt> {
        if self.coordinator.is_busy() {
            return Err(FileshareError::PublishInProgress);
        }
        let identity = self.active_identity().await?;
        self.coordinator.publish(&identity, name, bytes).await
    }

    /// Publish flow state.
    pub fn publish_state(&self) -> PublishState {
        self.coordinator.state()
    }

    /// Signup flow state.
    pub fn signup_state(&self) -> SignupState {
        self.signup.state()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // READS
    // ═══════════════════════════════════════════════════════════════════════

    /// Rebuilds the catalog.
    pub async fn refresh(&self) -> Result<Arc<Catalog>> {
        self.catalog.refresh().await
    }

    /// Every entry on the ledger.
    pub async fn all_files(&self) -> RefreshOutcome {
        self.catalog.refresh_or_stale().await
    }

    /// Entries recorded by the active account.
    pub async fn my_files(&self) -> Result<RefreshOutcome> {
        let identity = self.active_identity().await?;
        let outcome = self.catalog.refresh_or_stale().await;
        Ok(RefreshOutcome {
            catalog: Arc::new(filter_by_owner(&outcome.catalog, &identity)),
            error: outcome.error,
        })
    }

    /// Entries whose name contains `substring`, case-insensitively.
    pub async fn search(&self, substring: &str) -> RefreshOutcome {
        self.query(&CatalogQuery::new().with_name(substring)).await
    }

    /// Entries matching an owner and name query.
    pub async fn query(&self, query: &CatalogQuery) -> RefreshOutcome {
        let outcome = self.catalog.refresh_or_stale().await;
        RefreshOutcome {
            catalog: Arc::new(query.apply(&outcome.catalog)),
            error: outcome.error,
        }
    }

    /// Entry at `index`, read straight from the ledger.
    pub async fn file(&self, index: u64) -> Result<FileEntry> {
        self.registry.get_file(index).await
    }

    /// Catalog snapshot metadata.
    pub fn catalog_status(&self) -> CatalogStatus {
        self.catalog.status()
    }

    /// Downloads the bytes stored under `address`.
    pub async fn fetch(&self, address: &ContentAddress) -> Result<Vec<u8>> {
        self.store.get(address).await
    }

    /// Public URL for `address`, if the store has one.
    pub fn locator(&self, address: &ContentAddress) -> Option<String> {
        self.store.locator(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshare_registry::{MemoryRegistry, MemoryWallet};
    use fileshare_store::{content_address, MemoryContentStore};
    use tokio_test::{assert_err, assert_ok};

    fn alice() -> Identity {
        Identity::new("0x00000000000000000000000000000000000000a1").unwrap()
    }

    fn bob() -> Identity {
        Identity::new("0x00000000000000000000000000000000000000b2").unwrap()
    }

    struct Harness {
        wallet: Arc<MemoryWallet>,
        registry: Arc<MemoryRegistry>,
        store: Arc<MemoryContentStore>,
        session: Arc<Session>,
    }

    fn harness(account: Option<Identity>) -> Harness {
        let wallet = Arc::new(MemoryWallet::new(account));
        let registry = Arc::new(MemoryRegistry::new());
        let store = Arc::new(MemoryContentStore::new());
        let session = Arc::new(Session::new(wallet.clone(), registry.clone(), store.clone()));
        Harness {
            wallet,
            registry,
            store,
            session,
        }
    }

    /// Ledger whose `register` waits until released.
    struct SlowSignupLedger {
        inner: MemoryRegistry,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl RegistryClient for SlowSignupLedger {
        async fn is_registered(&self, id: &Identity) -> Result<bool> {
            self.inner.is_registered(id).await
        }
        async fn register(&self, id: &Identity) -> Result<fileshare_core::types::TransactionReceipt> {
            self.release.notified().await;
            self.inner.register(id).await
        }
        async fn file_count(&self) -> Result<u64> {
            self.inner.file_count().await
        }
        async fn get_file(&self, index: u64) -> Result<FileEntry> {
            self.inner.get_file(index).await
        }
        async fn add_file(
            &self,
            caller: &Identity,
            name: &str,
            address: &ContentAddress,
        ) -> Result<fileshare_core::types::TransactionReceipt> {
            self.inner.add_file(caller, name, address).await
        }
    }

    #[tokio::test]
    async fn test_account_switch_during_signup_keeps_new_account() {
        let wallet = Arc::new(MemoryWallet::new(Some(alice())));
        let ledger = Arc::new(SlowSignupLedger {
            inner: MemoryRegistry::new(),
            release: tokio::sync::Notify::new(),
        });
        let session = Arc::new(Session::new(
            wallet.clone(),
            ledger.clone(),
            Arc::new(MemoryContentStore::new()),
        ));

        let signup = {
            let session = session.clone();
            tokio::spawn(async move { session.sign_up().await })
        };
        while session.signup_state() != SignupState::Registering {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        wallet.set_account(Some(bob()));
        let status = session.handle_event(IdentityEvent::AccountChanged(bob())).await.unwrap();
        assert_eq!(status.map(|s| s.identity), Some(bob()));

        ledger.release.notify_one();
        let outcome = signup.await.unwrap().unwrap();
        assert!(matches!(outcome, SignupOutcome::Registered { .. }));

        // Alice is registered on the ledger, but the session follows bob.
        assert!(ledger.inner.is_registered(&alice()).await.unwrap());
        let account = session.account().unwrap();
        assert_eq!(account.identity, bob());
        assert!(!account.registered);
    }

    #[tokio::test]
    async fn test_connect_without_account() {
        let h = harness(None);
        assert!(matches!(h.session.connect().await, Err(FileshareError::NoProvider(_))));
        assert!(h.session.account().is_none());
    }

    #[tokio::test]
    async fn test_signup_then_publish() {
        let h = harness(Some(alice()));

        let status = h.session.connect().await.unwrap();
        assert!(!status.registered);

        let result = h.session.publish("a.txt", b"data").await;
        assert!(matches!(result, Err(FileshareError::NotRegistered(_))));
        assert_eq!(h.registry.file_count().await.unwrap(), 0);

        assert!(matches!(h.session.sign_up().await.unwrap(), SignupOutcome::Registered { .. }));
        assert!(h.session.account().unwrap().registered);
        assert_eq!(h.session.sign_up().await.unwrap(), SignupOutcome::AlreadyRegistered);
        assert_eq!(h.registry.register_calls(), 1);

        let receipt = h.session.publish("doc.txt", b"hello").await.unwrap();
        assert_eq!(receipt.address, content_address(b"hello").unwrap());
        assert_eq!(h.registry.file_count().await.unwrap(), 1);

        let entry = h.session.file(1).await.unwrap();
        assert_eq!(entry.owner, alice());
        assert_eq!(entry.name, "doc.txt");
        assert_eq!(entry.address, receipt.address);
    }

    #[tokio::test]
    async fn test_my_files_and_search() {
        let h = harness(Some(alice()));
        h.registry.register(&alice()).await.unwrap();
        h.registry.register(&bob()).await.unwrap();

        h.session.publish("doc.txt", b"1").await.unwrap();
        let addr = content_address(b"2").unwrap();
        h.registry.add_file(&bob(), "image.png", &addr).await.unwrap();
        h.session.publish("Document.md", b"3").await.unwrap();

        let mine = h.session.my_files().await.unwrap();
        assert!(!mine.is_stale());
        let names: Vec<_> = mine.catalog.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["doc.txt", "Document.md"]);

        let found = h.session.search("DOC").await;
        let indices: Vec<_> = found.catalog.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 3]);

        let all = h.session.all_files().await;
        assert_eq!(all.catalog.len(), 3);
        assert_ok!(all.catalog.verify_contiguous());
    }

    #[tokio::test]
    async fn test_read_failure_returns_stale_catalog() {
        let h = harness(Some(alice()));
        h.registry.register(&alice()).await.unwrap();
        h.session.publish("doc.txt", b"1").await.unwrap();

        h.registry.set_online(false);
        let outcome = h.session.all_files().await;
        assert!(outcome.is_stale());
        assert_eq!(outcome.catalog.len(), 1);
        assert!(h.session.catalog_status().stale);
    }

    #[tokio::test]
    async fn test_fetch_published_bytes() {
        let h = harness(Some(alice()));
        h.registry.register(&alice()).await.unwrap();

        let receipt = h.session.publish("doc.txt", b"hello").await.unwrap();
        assert_eq!(h.session.fetch(&receipt.address).await.unwrap(), b"hello");
        assert!(h.session.locator(&receipt.address).is_none());

        let missing = content_address(b"missing").unwrap();
        assert_err!(h.session.fetch(&missing).await);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_account_change_rechecks_registration() {
        let h = harness(Some(alice()));
        h.registry.register(&alice()).await.unwrap();
        assert!(h.session.connect().await.unwrap().registered);

        let watcher = {
            let session = h.session.clone();
            let events = h.wallet.subscribe();
            tokio::spawn(async move { session.watch(events).await })
        };

        h.wallet.set_account(Some(bob()));
        let mut status = h.session.account();
        for _ in 0..100 {
            if status.as_ref().map(|s| &s.identity) == Some(&bob()) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            status = h.session.account();
        }
        let status = status.unwrap();
        assert_eq!(status.identity, bob());
        assert!(!status.registered);

        watcher.abort();
    }

    #[tokio::test]
    async fn test_handle_event_directly() {
        let h = harness(Some(alice()));
        h.registry.register(&bob()).await.unwrap();

        let status = h.session.handle_event(IdentityEvent::AccountChanged(bob())).await.unwrap();
        assert_eq!(status, Some(AccountStatus { identity: bob(), registered: true }));

        assert_eq!(h.session.handle_event(IdentityEvent::Disconnected).await.unwrap(), None);
        assert!(h.session.account().is_none());
    }
}
