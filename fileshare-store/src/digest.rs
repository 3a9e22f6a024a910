//! Local content-address derivation.

use cid::Cid;
use multihash::Multihash;
use sha3::{Digest, Sha3_256};

use fileshare_core::constants::{RAW_CODEC, SHA3_256_CODE};
use fileshare_core::error::{FileshareError, Result};
use fileshare_core::types::ContentAddress;

/// Derives the content address of `data`.
///
/// CIDv1 with the `raw` codec over a SHA3-256 multihash, rendered in the
/// default base32 text form (`bafk...`).
pub fn content_address(data: &[u8]) -> Result<ContentAddress> {
    let digest = Sha3_256::digest(data);
    let hash = Multihash::<64>::wrap(SHA3_256_CODE, digest.as_slice())
        .map_err(|e| FileshareError::InternalError(format!("multihash: {}", e)))?;
    let cid = Cid::new_v1(RAW_CODEC, hash);
    ContentAddress::parse(cid.to_string())
}
