//! IPFS content store.
//!
//! Uploads via the Pinata v3 API, downloads through a gateway at
//! `<gateway_url>/<cid>`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use fileshare_core::constants::{DEFAULT_GATEWAY_URL, DEFAULT_REQUEST_TIMEOUT_SECS, PINATA_UPLOAD_URL};
use fileshare_core::error::{FileshareError, Result};
use fileshare_core::traits::ContentStore;
use fileshare_core::types::ContentAddress;

/// IPFS store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IpfsConfig {
    /// Gateway base for retrieval, including any `/ipfs` path segment
    pub gateway_url: String,
    /// Token for dedicated gateways (`?pinataGatewayToken=...`)
    pub gateway_token: Option<String>,
    /// Pinata JWT for uploads (v3 API)
    pub pinata_jwt: Option<String>,
    /// Upload endpoint
    pub upload_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.into(),
            gateway_token: None,
            pinata_jwt: None,
            upload_url: PINATA_UPLOAD_URL.into(),
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl IpfsConfig {
    /// Creates a config for the given gateway base.
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            ..Default::default()
        }
    }

    /// Adds Pinata JWT for uploads.
    pub fn with_pinata_jwt(mut self, jwt: impl Into<String>) -> Self {
        self.pinata_jwt = Some(jwt.into());
        self
    }

    /// Adds a dedicated-gateway access token.
    pub fn with_gateway_token(mut self, token: impl Into<String>) -> Self {
        self.gateway_token = Some(token.into());
        self
    }

    /// Overrides the upload endpoint.
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }

    /// Checks that both URLs parse.
    pub fn validate(&self) -> Result<()> {
        for (label, raw) in [("gateway_url", &self.gateway_url), ("upload_url", &self.upload_url)] {
            url::Url::parse(raw)
                .map_err(|e| FileshareError::ConfigError(format!("{}: {}", label, e)))?;
        }
        Ok(())
    }
}

/// Content store backed by IPFS.
pub struct IpfsStore {
    config: IpfsConfig,
    http_client: reqwest::Client,
}

impl IpfsStore {
    /// Creates a new store with the given config.
    pub fn with_config(config: IpfsConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| FileshareError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IpfsConfig {
        &self.config
    }

    fn download_url(&self, address: &ContentAddress) -> String {
        let locator = address.locator(&self.config.gateway_url);
        match &self.config.gateway_token {
            Some(token) => format!("{}?pinataGatewayToken={}", locator, token),
            None => locator,
        }
    }
}

fn store_error(e: reqwest::Error) -> FileshareError {
    if e.is_timeout() {
        FileshareError::StoreUnavailable(format!("timed out: {}", e))
    } else {
        FileshareError::StoreUnavailable(e.to_string())
    }
}

#[async_trait]
impl ContentStore for IpfsStore {
    /// Uploads bytes via Pinata v3 and returns the CID it assigned.
    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn put(&self, data: &[u8]) -> Result<ContentAddress> {
        let jwt = self
            .config
            .pinata_jwt
            .as_ref()
            .ok_or_else(|| FileshareError::ConfigError("Pinata JWT not configured".into()))?;

        let file_part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name("fileshare-upload.bin")
            .mime_str("application/octet-stream")
            .map_err(|e| FileshareError::StoreUnavailable(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("network", "public");

        let response = self
            .http_client
            .post(&self.config.upload_url)
            .header("Authorization", format!("Bearer {}", jwt))
            .multipart(form)
            .send()
            .await
            .map_err(store_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Upload rejected");
            return Err(FileshareError::StoreUnavailable(format!(
                "upload failed with status {}: {}",
                status, text
            )));
        }

        let json: PinataV3Response = response
            .json()
            .await
            .map_err(|e| FileshareError::StoreUnavailable(format!("bad upload response: {}", e)))?;

        let address = ContentAddress::parse(&json.data.cid)?;
        debug!(%address, "Uploaded to IPFS");
        Ok(address)
    }

    /// Downloads bytes through the configured gateway.
    #[instrument(skip(self))]
    async fn get(&self, address: &ContentAddress) -> Result<Vec<u8>> {
        if !address.is_canonical() {
            return Err(FileshareError::InvalidContentAddress(format!(
                "not a gateway-safe address: {}",
                address
            )));
        }

        let response = self
            .http_client
            .get(self.download_url(address))
            .send()
            .await
            .map_err(store_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FileshareError::NotFound(address.to_string()));
        }
        if !status.is_success() {
            return Err(FileshareError::StoreUnavailable(format!(
                "gateway returned HTTP {} for {}",
                status, address
            )));
        }

        debug!(%address, "Downloaded from gateway");
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(store_error)
    }

    fn locator(&self, address: &ContentAddress) -> Option<String> {
        address
            .is_canonical()
            .then(|| address.locator(&self.config.gateway_url))
    }
}

#[derive(Debug, Deserialize)]
struct PinataV3Response {
    data: PinataV3Data,
}

#[derive(Debug, Deserialize)]
struct PinataV3Data {
    cid: String,
}
