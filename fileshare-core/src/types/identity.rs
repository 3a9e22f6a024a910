//! Account identities supplied by the identity provider.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::ETH_ADDRESS_SIZE;
use crate::error::{FileshareError, Result};

/// An opaque account handle.
///
/// Handles are normalized on construction (trimmed, ASCII-lowercased) so a
/// checksummed Ethereum address and its lowercase form compare equal. The
/// ledger reports uploaders in whatever case the node chooses; ownership
/// filtering relies on this normalization.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Creates an identity from a raw account handle.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let normalized = raw.as_ref().trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(FileshareError::ValidationError(
                "identity cannot be empty".into(),
            ));
        }
        Ok(Self(normalized))
    }

    /// Builds an identity from a raw 20-byte Ethereum address.
    pub fn from_eth_bytes(bytes: &[u8; ETH_ADDRESS_SIZE]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Returns the normalized handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the handle is a `0x`-prefixed 20-byte hex address.
    pub fn is_eth_address(&self) -> bool {
        self.0.len() == 2 + ETH_ADDRESS_SIZE * 2
            && self.0.starts_with("0x")
            && self.0[2..].chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Decodes the handle as a 20-byte Ethereum address.
    pub fn to_eth_bytes(&self) -> Result<[u8; ETH_ADDRESS_SIZE]> {
        if !self.is_eth_address() {
            return Err(FileshareError::ValidationError(format!(
                "not an Ethereum address: {}",
                self.0
            )));
        }
        let mut out = [0u8; ETH_ADDRESS_SIZE];
        hex::decode_to_slice(&self.0[2..], &mut out)?;
        Ok(out)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl FromStr for Identity {
    type Err = FileshareError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}
