//! Transactions handed to the identity provider for signing.

use serde::{Deserialize, Serialize};

use super::Identity;

/// A state-changing contract call awaiting signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    /// Sending identity
    pub from: Identity,
    /// Contract address (0x-prefixed hex)
    pub to: String,
    /// ABI-encoded calldata
    #[serde(with = "hex")]
    pub data: Vec<u8>,
    /// Contract function name, for logs
    pub method: String,
}

impl ContractCall {
    /// Creates a new contract call.
    pub fn new(from: Identity, to: impl Into<String>, data: Vec<u8>, method: impl Into<String>) -> Self {
        Self {
            from,
            to: to.into(),
            data,
            method: method.into(),
        }
    }
}

/// Outcome of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Transaction hash (0x-prefixed hex)
    pub tx_hash: String,
    /// Block the transaction was included in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// False if the contract reverted
    pub success: bool,
}

impl TransactionReceipt {
    /// Creates a receipt for a successful transaction.
    pub fn confirmed(tx_hash: impl Into<String>, block_number: Option<u64>) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            block_number,
            success: true,
        }
    }
}

/// Events emitted by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityEvent {
    /// The active account switched.
    AccountChanged(Identity),
    /// The provider no longer exposes an account.
    Disconnected,
}
