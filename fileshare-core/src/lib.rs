//! # Fileshare Core
//!
//! Core types, errors, and traits for the Fileshare registry synchronization core.
//!
//! This crate provides the foundational building blocks used by all other Fileshare crates:
//!
//! - **Types**: Identities, content addresses, file entries, catalogs
//! - **Errors**: One error taxonomy covering identity, registry, store, validation and concurrency
//! - **Constants**: Contract signatures, codec codes and defaults
//! - **Traits**: `IdentityProvider`, `RegistryClient`, `ContentStore`
//!
//! ## Example
//!
//! ```rust
//! use fileshare_core::{ContentAddress, FileEntry, Identity};
//!
//! let owner = Identity::new("0xAbC0000000000000000000000000000000000001").unwrap();
//! let address = ContentAddress::parse("bafkreigh2akiscaildc").unwrap();
//! let entry = FileEntry::new(1, owner, "doc.txt", address);
//! assert!(entry.validate().is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{ErrorKind, FileshareError, Result};
pub use traits::*;
pub use types::*;
