//! Catalog cache for Fileshare.
//!
//! [`CatalogCache`] rebuilds the full entry list from a
//! [`fileshare_core::RegistryClient`] on demand; the functions in [`filter`]
//! narrow a snapshot without touching the ledger.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
pub mod filter;

pub use cache::{CatalogCache, CatalogConfig, CatalogStatus, RefreshOutcome};
pub use filter::{filter_by_name_contains, filter_by_owner, CatalogQuery};
