//! Domain types for Fileshare.
//!
//! - [`Identity`]: Account handle supplied by the identity provider
//! - [`ContentAddress`]: Hash-derived identifier of stored bytes
//! - [`FileEntry`]: One ledger record `(index, owner, name, address)`
//! - [`Catalog`]: Ordered sequence of file entries
//! - [`ContractCall`] / [`TransactionReceipt`]: Signing boundary

mod address;
mod entry;
mod identity;
mod transaction;

pub use address::*;
pub use entry::*;
pub use identity::*;
pub use transaction::*;
