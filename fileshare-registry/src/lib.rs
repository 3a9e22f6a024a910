//! # Fileshare Registry
//!
//! Clients for the append-only ledger that records who shared which file.
//!
//! - [`ContractRegistry`]: the deployed contract, read with `eth_call` and
//!   written through an [`IdentityProvider`]
//! - [`MemoryRegistry`]: in-process ledger with the same semantics
//!
//! Identity providers live here too, since writes are signed transactions:
//! [`RpcWallet`] uses node-managed accounts and [`MemoryWallet`] is scripted.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fileshare_registry::{ContractConfig, ContractRegistry, RpcConfig, RpcTransport, RpcWallet};
//!
//! let rpc = Arc::new(RpcTransport::with_config(RpcConfig::new("http://127.0.0.1:8545"))?);
//! let wallet = Arc::new(RpcWallet::new(rpc.clone()));
//! let registry = ContractRegistry::new(rpc, wallet, ContractConfig::new("0x5FbDB2315678afecb367f032d93F642f64180aa3")?);
//!
//! let count = registry.file_count().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod abi;
mod contract;
mod memory;
mod rpc;
mod wallet;

pub use contract::{ContractConfig, ContractRegistry};
pub use memory::MemoryRegistry;
pub use rpc::{decode_hex_data, parse_quantity, RpcConfig, RpcTransport};
pub use wallet::{MemoryWallet, RpcWallet, WalletConfig};

pub use fileshare_core::traits::{IdentityProvider, RegistryClient};
