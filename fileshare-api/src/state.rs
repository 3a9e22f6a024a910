//! App state: session, backends, config.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use fileshare_catalog::CatalogConfig;
use fileshare_core::constants::{DEFAULT_FETCH_CONCURRENCY, DEFAULT_GATEWAY_URL};
use fileshare_core::error::{FileshareError, Result};
use fileshare_core::traits::{ContentStore, IdentityProvider, RegistryClient};
use fileshare_core::types::Identity;
use fileshare_registry::{
    ContractConfig, ContractRegistry, MemoryRegistry, MemoryWallet, RpcConfig, RpcTransport, RpcWallet,
};
use fileshare_session::{Session, SessionConfig, StateObserver};
use fileshare_store::{IpfsConfig, IpfsStore, MemoryContentStore};

/// Account used by the in-memory backend when none is configured
/// (the first account of a default Hardhat/Anvil node).
pub const DEFAULT_DEV_ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Largest accepted upload body, in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// JSON-RPC node; `None` selects the in-memory ledger
    pub rpc_url: Option<String>,
    /// Ledger contract address, required with `rpc_url`
    pub contract_address: Option<String>,
    /// Gateway base for content locators and downloads
    pub gateway_url: String,
    /// Dedicated-gateway token
    pub gateway_token: Option<String>,
    /// Pinata JWT; `None` selects the in-memory content store
    pub pinata_jwt: Option<String>,
    /// Concurrent `get_file` calls per refresh
    pub fetch_concurrency: usize,
    /// Active account for the in-memory wallet
    pub dev_account: Option<String>,
    /// Upload size limit
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract_address: None,
            gateway_url: DEFAULT_GATEWAY_URL.into(),
            gateway_token: None,
            pinata_jwt: None,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            dev_account: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ApiConfig {
    /// Reads `.env` and the `FILESHARE_*` / `PINATA_JWT` variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            rpc_url: non_empty_var("FILESHARE_RPC_URL"),
            contract_address: non_empty_var("FILESHARE_CONTRACT_ADDRESS"),
            gateway_url: non_empty_var("FILESHARE_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            gateway_token: non_empty_var("FILESHARE_GATEWAY_TOKEN"),
            pinata_jwt: non_empty_var("PINATA_JWT"),
            fetch_concurrency: non_empty_var("FILESHARE_FETCH_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_concurrency),
            dev_account: non_empty_var("FILESHARE_DEV_ACCOUNT"),
            max_upload_bytes: non_empty_var("FILESHARE_MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }

    /// True if no node is configured.
    pub fn is_dev(&self) -> bool {
        self.rpc_url.is_none()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Shared handler state.
pub struct AppState {
    /// Server configuration
    pub config: ApiConfig,
    /// The session every request runs against
    pub session: Arc<Session>,
    /// Ledger backend label
    pub backend: &'static str,
}

impl AppState {
    /// Builds the backends the configuration selects.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Self::with_observer(config, None)
    }

    /// Like [`AppState::new`], reporting publish state changes to `observer`.
    pub fn with_observer(config: ApiConfig, observer: Option<StateObserver>) -> Result<Self> {
        // A real ledger always pairs with IPFS. Without a JWT uploads fail
        // with StoreUnavailable; downloads still go through the gateway.
        let use_ipfs = config.rpc_url.is_some() || config.pinata_jwt.is_some();
        let store: Arc<dyn ContentStore> = if use_ipfs {
            let mut ipfs = IpfsConfig::new(&config.gateway_url);
            if let Some(jwt) = &config.pinata_jwt {
                ipfs = ipfs.with_pinata_jwt(jwt);
            }
            if let Some(token) = &config.gateway_token {
                ipfs = ipfs.with_gateway_token(token);
            }
            Arc::new(IpfsStore::with_config(ipfs)?)
        } else {
            Arc::new(MemoryContentStore::new())
        };

        let store_kind = if use_ipfs { "ipfs" } else { "memory" };

        let (identity, registry, backend) = match &config.rpc_url {
            Some(url) => {
                let address = config.contract_address.as_deref().ok_or_else(|| {
                    FileshareError::ConfigError(
                        "FILESHARE_CONTRACT_ADDRESS is required with FILESHARE_RPC_URL".into(),
                    )
                })?;
                let rpc = Arc::new(RpcTransport::with_config(RpcConfig::new(url))?);
                let wallet: Arc<dyn IdentityProvider> = Arc::new(RpcWallet::new(rpc.clone()));
                let registry: Arc<dyn RegistryClient> =
                    Arc::new(ContractRegistry::new(rpc, wallet.clone(), ContractConfig::new(address)?));
                (wallet, registry, "contract")
            }
            None => {
                let account = Identity::new(config.dev_account.as_deref().unwrap_or(DEFAULT_DEV_ACCOUNT))?;
                let wallet: Arc<dyn IdentityProvider> = Arc::new(MemoryWallet::new(Some(account)));
                let registry: Arc<dyn RegistryClient> = Arc::new(MemoryRegistry::new());
                (wallet, registry, "memory")
            }
        };

        info!(backend, store = store_kind, "Backends ready");

        let session_config = SessionConfig {
            catalog: CatalogConfig::default().with_fetch_concurrency(config.fetch_concurrency),
        };
        let session = Session::with_config(identity, registry, store, session_config, observer);

        Ok(Self::with_session(config, Arc::new(session), backend))
    }

    /// Wraps an existing session.
    pub fn with_session(config: ApiConfig, session: Arc<Session>, backend: &'static str) -> Self {
        Self {
            config,
            session,
            backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshare_core::types::ContentAddress;

    #[test]
    fn test_default_config_is_dev() {
        let config = ApiConfig::default();
        assert!(config.is_dev());
        let state = AppState::new(config).unwrap();
        assert_eq!(state.backend, "memory");
    }

    #[test]
    fn test_rpc_requires_contract() {
        let config = ApiConfig {
            rpc_url: Some("http://127.0.0.1:8545".into()),
            ..Default::default()
        };
        assert!(matches!(AppState::new(config), Err(FileshareError::ConfigError(_))));
    }

    #[test]
    fn test_contract_backend() {
        let config = ApiConfig {
            rpc_url: Some("http://127.0.0.1:8545".into()),
            contract_address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".into()),
            ..Default::default()
        };
        assert_eq!(AppState::new(config).unwrap().backend, "contract");
    }

    #[test]
    fn test_contract_backend_never_uses_memory_store() {
        let config = ApiConfig {
            rpc_url: Some("http://127.0.0.1:8545".into()),
            contract_address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".into()),
            gateway_url: "https://gateway.example.com/ipfs".into(),
            ..Default::default()
        };
        let state = AppState::new(config).unwrap();
        let address = ContentAddress::parse("bafkreiabc").unwrap();
        assert_eq!(
            state.session.locator(&address).as_deref(),
            Some("https://gateway.example.com/ipfs/bafkreiabc")
        );
    }

    #[test]
    fn test_dev_backend_has_no_locator() {
        let state = AppState::new(ApiConfig::default()).unwrap();
        let address = ContentAddress::parse("bafkreiabc").unwrap();
        assert!(state.session.locator(&address).is_none());
    }
}
