//! Common traits for Fileshare.
//!
//! These traits are the seams between the synchronization core and the three
//! external systems it reconciles. Each has a production implementation
//! (JSON-RPC wallet, ledger contract, IPFS) and an in-memory one for tests
//! and local development.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ContentAddress, ContractCall, FileEntry, Identity, TransactionReceipt};

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY PROVIDER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the wallet that owns the active account.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the active account, or `None` if the wallet exposes none.
    ///
    /// Fails with `NoProvider` if no wallet is reachable.
    async fn active_account(&self) -> Result<Option<Identity>>;

    /// Signs and submits a contract call, waiting for it to be mined.
    ///
    /// Fails with `UserRejected` if the user declines. Callers must not
    /// resubmit automatically.
    async fn sign_and_send(&self, call: ContractCall) -> Result<TransactionReceipt>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY CLIENT TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Typed binding over the append-only ledger contract.
///
/// All operations may fail with `ConnectionLost` or `Timeout`. None of them
/// retry internally.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Returns whether the identity is registered. Read-only.
    async fn is_registered(&self, id: &Identity) -> Result<bool>;

    /// Registers the identity.
    ///
    /// Fails with `AlreadyRegistered` on a redundant call.
    async fn register(&self, id: &Identity) -> Result<TransactionReceipt>;

    /// Returns the highest assigned file index (0 if none).
    async fn file_count(&self) -> Result<u64>;

    /// Returns the entry at `index`.
    ///
    /// Fails with `IndexOutOfRange` unless `1 <= index <= file_count()`.
    async fn get_file(&self, index: u64) -> Result<FileEntry>;

    /// Records a new file entry owned by `caller`.
    ///
    /// Fails with `NotRegistered` if `caller` is not registered.
    async fn add_file(
        &self,
        caller: &Identity,
        name: &str,
        address: &ContentAddress,
    ) -> Result<TransactionReceipt>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTENT STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the content-addressed blob store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Stores bytes and returns their content address.
    ///
    /// Identical bytes always yield the same address. Success means the
    /// bytes are durable.
    async fn put(&self, data: &[u8]) -> Result<ContentAddress>;

    /// Fetches the bytes stored under `address`.
    ///
    /// Fails with `NotFound` if nothing is stored there.
    async fn get(&self, address: &ContentAddress) -> Result<Vec<u8>>;

    /// External URL the content can be fetched from, if the store has one.
    fn locator(&self, _address: &ContentAddress) -> Option<String> {
        None
    }
}
