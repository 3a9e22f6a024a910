//! Ethereum JSON-RPC transport shared by the contract binding and the wallet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use fileshare_core::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RPC_URL, EIP1193_USER_REJECTED};
use fileshare_core::error::{FileshareError, Result};

/// JSON-RPC endpoint configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Node URL
    pub url: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.into(),
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RpcConfig {
    /// Creates a configuration for the given node URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// JSON-RPC client over HTTP.
pub struct RpcTransport {
    config: RpcConfig,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcTransport {
    /// Creates a transport with the given configuration.
    pub fn with_config(config: RpcConfig) -> Result<Self> {
        url::Url::parse(&config.url)
            .map_err(|e| FileshareError::ConfigError(format!("rpc url: {}", e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| FileshareError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Returns the node URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Sends a request and returns its `result` member.
    pub async fn request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        self.request_optional(method, params)
            .await?
            .ok_or_else(|| FileshareError::InvalidResponse(format!("{}: missing result", method)))
    }

    /// Sends a request whose `result` may legitimately be `null`.
    #[instrument(skip(self, params))]
    pub async fn request_optional(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<serde_json::Value>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let response = self
            .http_client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(FileshareError::ConnectionLost(format!(
                "node returned HTTP {}",
                response.status()
            )));
        }

        let body: RpcResponse = response.json().await.map_err(transport_error)?;

        if let Some(error) = body.error {
            debug!(code = error.code, message = %error.message, "RPC error");
            if error.code == EIP1193_USER_REJECTED {
                return Err(FileshareError::UserRejected);
            }
            return Err(FileshareError::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        Ok(body.result)
    }

    /// Executes a read-only contract call against the latest block.
    pub async fn eth_call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>> {
        let params = serde_json::json!([
            { "to": to, "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        let result = self.request("eth_call", params).await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| FileshareError::InvalidResponse("eth_call result is not a string".into()))?;
        decode_hex_data(hex_str)
    }
}

/// Maps a reqwest failure onto the registry's retryable errors.
pub(crate) fn transport_error(e: reqwest::Error) -> FileshareError {
    if e.is_timeout() {
        FileshareError::Timeout(e.to_string())
    } else if e.is_decode() {
        FileshareError::InvalidResponse(e.to_string())
    } else {
        FileshareError::ConnectionLost(e.to_string())
    }
}

/// Decodes `0x`-prefixed hex data (`"0x"` is empty).
pub fn decode_hex_data(s: &str) -> Result<Vec<u8>> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(stripped)?)
}

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(s: &str) -> Result<u64> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(stripped, 16)
        .map_err(|e| FileshareError::InvalidResponse(format!("bad quantity '{}': {}", s, e)))
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}
