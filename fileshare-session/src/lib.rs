//! # Fileshare Session
//!
//! The write path and the per-account view.
//!
//! - [`PublishCoordinator`]: `Validating → Storing → Recording → Done`, one
//!   attempt at a time
//! - [`SignupFlow`]: registration gated by an `is_registered` pre-check
//! - [`Session`]: active account tracking, registration cache and catalog
//!   queries
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fileshare_registry::{MemoryRegistry, MemoryWallet};
//! use fileshare_session::Session;
//! use fileshare_store::MemoryContentStore;
//!
//! let session = Session::new(
//!     Arc::new(MemoryWallet::new(Some(alice))),
//!     Arc::new(MemoryRegistry::new()),
//!     Arc::new(MemoryContentStore::new()),
//! );
//!
//! session.sign_up().await?;
//! let receipt = session.publish("doc.txt", b"hello").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod publish;
mod session;
mod signup;
mod state;

pub use publish::{PublishCoordinator, PublishReceipt, StateObserver};
pub use session::{AccountStatus, Session, SessionConfig};
pub use signup::{SignupFlow, SignupOutcome};
pub use state::{FailureReason, PublishState, SignupState};
