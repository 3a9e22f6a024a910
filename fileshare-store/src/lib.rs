//! Content store clients for Fileshare.
//!
//! - [`IpfsStore`]: uploads through Pinata v3, downloads through a gateway
//! - [`MemoryContentStore`]: deterministic in-process store for tests and dev
//!
//! Both implement [`fileshare_core::ContentStore`].

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod digest;
mod ipfs;
mod memory;

pub use digest::content_address;
pub use ipfs::{IpfsConfig, IpfsStore};
pub use memory::MemoryContentStore;
