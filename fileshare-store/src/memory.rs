//! In-memory content store.
//!
//! Addresses are derived locally, so identical bytes always land on the same
//! key and repeated puts are no-ops at the storage layer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use fileshare_core::error::{FileshareError, Result};
use fileshare_core::traits::ContentStore;
use fileshare_core::types::ContentAddress;

use crate::digest::content_address;

/// Thread-safe in-memory content store.
#[derive(Debug)]
pub struct MemoryContentStore {
    /// Stored blobs keyed by address
    blobs: DashMap<ContentAddress, Vec<u8>>,
    /// Whether puts succeed
    available: AtomicBool,
    /// Number of `put` calls, including failed ones
    put_calls: AtomicU64,
}

impl MemoryContentStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
            available: AtomicBool::new(true),
            put_calls: AtomicU64::new(0),
        }
    }

    /// Makes subsequent puts succeed or fail with `StoreUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `put` calls seen so far.
    pub fn put_calls(&self) -> u64 {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Returns true if bytes are stored under `address`.
    pub fn contains(&self, address: &ContentAddress) -> bool {
        self.blobs.contains_key(address)
    }

    /// Returns the number of distinct blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn put(&self, data: &[u8]) -> Result<ContentAddress> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(FileshareError::StoreUnavailable(
                "in-memory store is offline".into(),
            ));
        }

        let address = content_address(data)?;
        self.blobs
            .entry(address.clone())
            .or_insert_with(|| data.to_vec());

        debug!(%address, "Stored content");
        Ok(address)
    }

    #[instrument(skip(self))]
    async fn get(&self, address: &ContentAddress) -> Result<Vec<u8>> {
        self.blobs
            .get(address)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| FileshareError::NotFound(address.to_string()))
    }
}
