//! Content addresses: the join key between the blob store and the ledger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::MAX_CONTENT_ADDRESS_LEN;
use crate::error::{FileshareError, Result};

/// A content address in its text form (e.g. a CID).
///
/// The core never derives addresses itself; it carries whatever the content
/// store returned and the ledger recorded. Addresses from users and stores go
/// through [`parse`](Self::parse); addresses read back from the ledger are
/// kept verbatim with [`from_ledger`](Self::from_ledger), since the contract
/// accepts any string. [`is_canonical`](Self::is_canonical) tells the two
/// apart before an address is embedded in a gateway URL.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Parses and validates a content address.
    pub fn parse(s: impl AsRef<str>) -> Result<Self> {
        let s = s.as_ref().trim();
        check_canonical(s)?;
        Ok(Self(s.to_string()))
    }

    /// Wraps a hash exactly as the ledger recorded it.
    pub fn from_ledger(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// True if the address would pass [`parse`](Self::parse) unchanged.
    pub fn is_canonical(&self) -> bool {
        check_canonical(&self.0).is_ok()
    }

    /// Returns the text form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the external locator `<gateway_base>/<address>`.
    ///
    /// Callers should check [`is_canonical`](Self::is_canonical) first for
    /// ledger-sourced addresses.
    pub fn locator(&self, gateway_base: &str) -> String {
        format!("{}/{}", gateway_base.trim_end_matches('/'), self.0)
    }
}

fn check_canonical(s: &str) -> Result<()> {
    if s.is_empty() {
        return Err(FileshareError::InvalidContentAddress(
            "address cannot be empty".into(),
        ));
    }

    if s.len() > MAX_CONTENT_ADDRESS_LEN {
        return Err(FileshareError::InvalidContentAddress(format!(
            "address too long: {} characters",
            s.len()
        )));
    }

    if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FileshareError::InvalidContentAddress(
            "address contains invalid characters".into(),
        ));
    }

    Ok(())
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({})", self.0)
    }
}

impl FromStr for ContentAddress {
    type Err = FileshareError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ContentAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ContentAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Serialized entries may carry ledger-sourced addresses.
        Ok(Self::from_ledger(String::deserialize(deserializer)?))
    }
}
