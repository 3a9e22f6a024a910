//! Identity providers.
//!
//! - [`RpcWallet`]: node-managed accounts over JSON-RPC (`eth_accounts`,
//!   `eth_sendTransaction`), the setup a local development chain exposes
//! - [`MemoryWallet`]: scripted in-process wallet for tests and dev mode

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use fileshare_core::constants::DEFAULT_RECEIPT_POLL_MS;
use fileshare_core::error::{FileshareError, Result};
use fileshare_core::traits::IdentityProvider;
use fileshare_core::types::{ContractCall, Identity, IdentityEvent, TransactionReceipt};

use crate::rpc::{parse_quantity, RpcTransport};

/// Capacity of the account-change event channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Wallet configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Interval between receipt polls in milliseconds
    pub receipt_poll_ms: u64,
    /// Give up waiting for inclusion after this many seconds (None = wait forever)
    pub confirmation_timeout_seconds: Option<u64>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            receipt_poll_ms: DEFAULT_RECEIPT_POLL_MS,
            confirmation_timeout_seconds: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RPC WALLET
// ═══════════════════════════════════════════════════════════════════════════════

/// Wallet backed by accounts the JSON-RPC node manages.
pub struct RpcWallet {
    rpc: Arc<RpcTransport>,
    config: WalletConfig,
}

impl RpcWallet {
    /// Creates a wallet over the given transport.
    pub fn new(rpc: Arc<RpcTransport>) -> Self {
        Self::with_config(rpc, WalletConfig::default())
    }

    /// Creates a wallet with custom configuration.
    pub fn with_config(rpc: Arc<RpcTransport>, config: WalletConfig) -> Self {
        Self { rpc, config }
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt> {
        let poll = Duration::from_millis(self.config.receipt_poll_ms.max(1));
        loop {
            let result = self
                .rpc
                .request_optional("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
                .await?;

            if let Some(receipt) = result.filter(|v| !v.is_null()) {
                return parse_receipt(tx_hash, &receipt);
            }

            debug!(tx_hash, "Receipt pending");
            tokio::time::sleep(poll).await;
        }
    }
}

fn parse_receipt(tx_hash: &str, receipt: &serde_json::Value) -> Result<TransactionReceipt> {
    let status = receipt
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FileshareError::InvalidResponse("receipt without status".into()))?;
    let block_number = receipt
        .get("blockNumber")
        .and_then(|v| v.as_str())
        .map(parse_quantity)
        .transpose()?;

    Ok(TransactionReceipt {
        tx_hash: tx_hash.to_string(),
        block_number,
        success: parse_quantity(status)? == 1,
    })
}

#[async_trait]
impl IdentityProvider for RpcWallet {
    #[instrument(skip(self))]
    async fn active_account(&self) -> Result<Option<Identity>> {
        let result = self
            .rpc
            .request("eth_accounts", serde_json::json!([]))
            .await
            .map_err(|e| match e {
                FileshareError::ConnectionLost(msg) | FileshareError::Timeout(msg) => {
                    FileshareError::NoProvider(msg)
                }
                other => other,
            })?;

        let accounts: Vec<String> = serde_json::from_value(result)?;
        accounts.first().map(Identity::new).transpose()
    }

    #[instrument(skip(self, call), fields(method = %call.method, from = %call.from))]
    async fn sign_and_send(&self, call: ContractCall) -> Result<TransactionReceipt> {
        let params = serde_json::json!([{
            "from": call.from.as_str(),
            "to": call.to,
            "data": format!("0x{}", hex::encode(&call.data)),
        }]);

        let result = self.rpc.request("eth_sendTransaction", params).await?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| FileshareError::InvalidResponse("tx hash is not a string".into()))?
            .to_string();

        info!(%tx_hash, "Transaction submitted");

        let receipt = match self.config.confirmation_timeout_seconds {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), self.wait_for_receipt(&tx_hash))
                .await
                .map_err(|_| {
                    warn!(%tx_hash, secs, "Confirmation timed out");
                    FileshareError::Timeout(format!("transaction {} not mined after {}s", tx_hash, secs))
                })??,
            None => self.wait_for_receipt(&tx_hash).await?,
        };

        debug!(%tx_hash, success = receipt.success, "Transaction mined");
        Ok(receipt)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMORY WALLET
// ═══════════════════════════════════════════════════════════════════════════════

/// In-process wallet with a switchable account.
///
/// `sign_and_send` records the call and returns a synthetic receipt; it does
/// not execute anything. Use it with [`crate::ContractRegistry`] against a
/// mock node, or as the account source for the in-memory backend.
pub struct MemoryWallet {
    account: RwLock<Option<Identity>>,
    reject_next: AtomicBool,
    sent: RwLock<Vec<ContractCall>>,
    nonce: AtomicU64,
    events: broadcast::Sender<IdentityEvent>,
}

impl MemoryWallet {
    /// Creates a wallet with the given active account.
    pub fn new(account: Option<Identity>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            account: RwLock::new(account),
            reject_next: AtomicBool::new(false),
            sent: RwLock::new(Vec::new()),
            nonce: AtomicU64::new(0),
            events,
        }
    }

    /// Switches the active account and emits the matching event.
    pub fn set_account(&self, account: Option<Identity>) {
        *self.account.write() = account.clone();
        let event = match account {
            Some(id) => IdentityEvent::AccountChanged(id),
            None => IdentityEvent::Disconnected,
        };
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Subscribes to account-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        self.events.subscribe()
    }

    /// Makes the next `sign_and_send` fail with `UserRejected`.
    pub fn reject_next(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Calls signed so far, in order.
    pub fn sent_calls(&self) -> Vec<ContractCall> {
        self.sent.read().clone()
    }
}

#[async_trait]
impl IdentityProvider for MemoryWallet {
    async fn active_account(&self) -> Result<Option<Identity>> {
        Ok(self.account.read().clone())
    }

    #[instrument(skip(self, call), fields(method = %call.method))]
    async fn sign_and_send(&self, call: ContractCall) -> Result<TransactionReceipt> {
        if self.account.read().is_none() {
            return Err(FileshareError::NoProvider("no active account".into()));
        }
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(FileshareError::UserRejected);
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.write().push(call);
        Ok(TransactionReceipt::confirmed(format!("0x{:064x}", nonce), Some(nonce)))
    }
}
