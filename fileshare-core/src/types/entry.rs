//! Ledger file entries and the catalog built from them.

use serde::{Deserialize, Serialize};

use super::{ContentAddress, Identity};
use crate::error::{FileshareError, Result};

/// A file entry recorded on the ledger.
///
/// Entries are append-only: the ledger assigns `index` once and never
/// mutates or removes the entry afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// 1-based, contract-assigned index
    pub index: u64,
    /// Identity that recorded the entry
    pub owner: Identity,
    /// Display name
    pub name: String,
    /// Content address of the file bytes
    pub address: ContentAddress,
}

impl FileEntry {
    /// Creates a new entry.
    pub fn new(index: u64, owner: Identity, name: impl Into<String>, address: ContentAddress) -> Self {
        Self {
            index,
            owner,
            name: name.into(),
            address,
        }
    }

    /// Validates the entry structure.
    pub fn validate(&self) -> Result<()> {
        if self.index == 0 {
            return Err(FileshareError::ValidationError(
                "file index must be positive".into(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(FileshareError::EmptyName);
        }
        Ok(())
    }
}

/// An ordered sequence of file entries.
///
/// A catalog produced by a refresh holds indices `1..=n` in order. Filtered
/// catalogs are order-preserving subsequences of such a catalog, so they keep
/// ascending indices but may have gaps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<FileEntry>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps entries without checking their order.
    pub fn from_entries(entries: Vec<FileEntry>) -> Self {
        Self { entries }
    }

    /// Checks that indices are exactly `1..=len` in order.
    pub fn verify_contiguous(&self) -> Result<()> {
        for (pos, entry) in self.entries.iter().enumerate() {
            let expected = pos as u64 + 1;
            if entry.index != expected {
                return Err(FileshareError::CatalogIntegrity(format!(
                    "expected index {} at position {}, found {}",
                    expected, pos, entry.index
                )));
            }
        }
        Ok(())
    }

    /// Returns true if indices strictly increase.
    pub fn is_ascending(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].index < w[1].index)
    }

    /// Returns a new catalog with the entries matching `pred`, in order.
    pub fn filtered<F>(&self, mut pred: F) -> Catalog
    where
        F: FnMut(&FileEntry) -> bool,
    {
        Catalog {
            entries: self.entries.iter().filter(|e| pred(e)).cloned().collect(),
        }
    }

    /// Looks up an entry by ledger index.
    pub fn get(&self, index: u64) -> Option<&FileEntry> {
        self.entries
            .binary_search_by_key(&index, |e| e.index)
            .ok()
            .map(|pos| &self.entries[pos])
    }

    /// Returns the entries in order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Consumes the catalog, returning its entries.
    pub fn into_entries(self) -> Vec<FileEntry> {
        self.entries
    }

    /// Iterates entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    /// Highest index present, if any.
    pub fn last_index(&self) -> Option<u64> {
        self.entries.last().map(|e| e.index)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
