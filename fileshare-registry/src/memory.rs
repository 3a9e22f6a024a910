//! In-memory ledger.
//!
//! Behaves like the deployed contract (append-only entries, 1-based indices,
//! signup guard) without a chain. Suitable for development, testing, and
//! single-process deployments.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashSet;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use fileshare_core::error::{FileshareError, Result};
use fileshare_core::traits::RegistryClient;
use fileshare_core::types::{ContentAddress, FileEntry, Identity, TransactionReceipt};

/// In-memory ledger.
///
/// # Thread Safety
///
/// All operations are thread-safe. `add_file` appends under a write lock, so
/// concurrent writers always receive distinct, contiguous indices.
#[derive(Debug)]
pub struct MemoryRegistry {
    /// Registered identities
    registered: DashSet<Identity>,
    /// Entries in index order; entry `i` lives at position `i - 1`
    entries: RwLock<Vec<FileEntry>>,
    /// When false, every call fails with `ConnectionLost`
    online: AtomicBool,
    /// Synthetic block height, one block per accepted write
    block: AtomicU64,
    register_calls: AtomicU64,
    add_file_calls: AtomicU64,
}

impl MemoryRegistry {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            registered: DashSet::new(),
            entries: RwLock::new(Vec::new()),
            online: AtomicBool::new(true),
            block: AtomicU64::new(0),
            register_calls: AtomicU64::new(0),
            add_file_calls: AtomicU64::new(0),
        }
    }

    /// Simulates losing (false) or regaining (true) the connection.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of `register` calls received, including failed ones.
    pub fn register_calls(&self) -> u64 {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Number of `add_file` calls received, including failed ones.
    pub fn add_file_calls(&self) -> u64 {
        self.add_file_calls.load(Ordering::SeqCst)
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no entries are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns all entries in index order.
    pub fn all_entries(&self) -> Vec<FileEntry> {
        self.entries.read().clone()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FileshareError::ConnectionLost("ledger offline".into()))
        }
    }

    fn next_receipt(&self) -> TransactionReceipt {
        let block = self.block.fetch_add(1, Ordering::SeqCst) + 1;
        TransactionReceipt::confirmed(format!("0x{:064x}", block), Some(block))
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn is_registered(&self, identity: &Identity) -> Result<bool> {
        self.ensure_online()?;
        Ok(self.registered.contains(identity))
    }

    #[instrument(skip(self))]
    async fn register(&self, identity: &Identity) -> Result<TransactionReceipt> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        if !self.registered.insert(identity.clone()) {
            return Err(FileshareError::AlreadyRegistered(identity.to_string()));
        }
        debug!(%identity, "Registered");
        Ok(self.next_receipt())
    }

    async fn file_count(&self) -> Result<u64> {
        self.ensure_online()?;
        Ok(self.entries.read().len() as u64)
    }

    async fn get_file(&self, index: u64) -> Result<FileEntry> {
        self.ensure_online()?;
        let entries = self.entries.read();
        let count = entries.len() as u64;

        index
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| entries.get(i))
            .cloned()
            .ok_or(FileshareError::IndexOutOfRange { index, count })
    }

    #[instrument(skip(self))]
    async fn add_file(
        &self,
        caller: &Identity,
        name: &str,
        address: &ContentAddress,
    ) -> Result<TransactionReceipt> {
        self.add_file_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        if !self.registered.contains(caller) {
            return Err(FileshareError::NotRegistered(caller.to_string()));
        }

        let index = {
            let mut entries = self.entries.write();
            let index = entries.len() as u64 + 1;
            entries.push(FileEntry::new(index, caller.clone(), name, address.clone()));
            index
        };

        debug!(index, "File recorded");
        Ok(self.next_receipt())
    }
}
