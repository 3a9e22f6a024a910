//! Registry client bound to the deployed ledger contract.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use fileshare_core::error::{FileshareError, Result};
use fileshare_core::traits::{IdentityProvider, RegistryClient};
use fileshare_core::types::{ContentAddress, ContractCall, FileEntry, Identity, TransactionReceipt};

use crate::abi;
use crate::rpc::RpcTransport;

/// Location of the ledger contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Contract address (0x-prefixed, 40 hex digits)
    pub address: String,
}

impl ContractConfig {
    /// Creates a config, normalizing the address to lowercase.
    pub fn new(address: impl AsRef<str>) -> Result<Self> {
        let address = address.as_ref().trim().to_ascii_lowercase();
        let digits = address
            .strip_prefix("0x")
            .ok_or_else(|| FileshareError::ConfigError("contract address must start with 0x".into()))?;
        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(FileshareError::ConfigError(format!(
                "invalid contract address: {}",
                address
            )));
        }
        Ok(Self { address })
    }
}

/// Ledger contract client.
///
/// Reads go straight to the node with `eth_call`; writes are signed and
/// submitted by the identity provider. A reverted `signup` means the caller
/// is already registered and a reverted `uploadFile` means it is not, since
/// those are the only `require` guards the contract has.
pub struct ContractRegistry {
    rpc: Arc<RpcTransport>,
    signer: Arc<dyn IdentityProvider>,
    config: ContractConfig,
}

impl ContractRegistry {
    /// Binds a client to the contract.
    pub fn new(rpc: Arc<RpcTransport>, signer: Arc<dyn IdentityProvider>, config: ContractConfig) -> Self {
        Self { rpc, signer, config }
    }

    /// Contract address.
    pub fn address(&self) -> &str {
        &self.config.address
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        self.rpc.eth_call(&self.config.address, &data).await
    }

    async fn send(&self, from: &Identity, data: Vec<u8>, method: &str) -> Result<TransactionReceipt> {
        let call = ContractCall::new(from.clone(), self.config.address.clone(), data, method);
        self.signer.sign_and_send(call).await
    }
}

/// Nodes that simulate before sending (Hardhat, Anvil, Ganache) reject a
/// reverting transaction up front with an error instead of mining it.
fn is_revert(err: &FileshareError) -> bool {
    match err {
        FileshareError::RpcError { code, message } => {
            *code == 3 || message.to_ascii_lowercase().contains("revert")
        }
        _ => false,
    }
}

#[async_trait]
impl RegistryClient for ContractRegistry {
    #[instrument(skip(self), fields(contract = %self.config.address))]
    async fn is_registered(&self, identity: &Identity) -> Result<bool> {
        let data = abi::encode_registered_users(identity)?;
        abi::decode_bool(&self.call(data).await?)
    }

    #[instrument(skip(self), fields(contract = %self.config.address))]
    async fn register(&self, identity: &Identity) -> Result<TransactionReceipt> {
        let receipt = match self.send(identity, abi::encode_signup(), "signup").await {
            Err(e) if is_revert(&e) => {
                warn!(error = %e, "signup rejected by node");
                return Err(FileshareError::AlreadyRegistered(identity.to_string()));
            }
            other => other?,
        };
        if !receipt.success {
            warn!(tx_hash = %receipt.tx_hash, "signup reverted");
            return Err(FileshareError::AlreadyRegistered(identity.to_string()));
        }
        info!(%identity, "Registered");
        Ok(receipt)
    }

    #[instrument(skip(self), fields(contract = %self.config.address))]
    async fn file_count(&self) -> Result<u64> {
        abi::decode_uint(&self.call(abi::encode_file_count()).await?)
    }

    #[instrument(skip(self), fields(contract = %self.config.address))]
    async fn get_file(&self, index: u64) -> Result<FileEntry> {
        let record = if index == 0 {
            None
        } else {
            let record = abi::decode_file_record(&self.call(abi::encode_files(index)).await?)?;
            (!record.is_empty()).then_some(record)
        };

        let Some(record) = record else {
            let count = self.file_count().await?;
            return Err(FileshareError::IndexOutOfRange { index, count });
        };

        let entry = FileEntry::new(
            index,
            Identity::from_eth_bytes(&record.uploader),
            record.name,
            ContentAddress::from_ledger(record.hash),
        );
        debug!(index, owner = %entry.owner, "Fetched file entry");
        Ok(entry)
    }

    #[instrument(skip(self), fields(contract = %self.config.address))]
    async fn add_file(
        &self,
        caller: &Identity,
        name: &str,
        address: &ContentAddress,
    ) -> Result<TransactionReceipt> {
        let data = abi::encode_upload_file(name, address.as_str());
        let receipt = match self.send(caller, data, "uploadFile").await {
            Err(e) if is_revert(&e) => {
                warn!(error = %e, "uploadFile rejected by node");
                return Err(FileshareError::NotRegistered(caller.to_string()));
            }
            other => other?,
        };
        if !receipt.success {
            warn!(tx_hash = %receipt.tx_hash, "uploadFile reverted");
            return Err(FileshareError::NotRegistered(caller.to_string()));
        }
        info!(%caller, name, %address, "File recorded");
        Ok(receipt)
    }
}
