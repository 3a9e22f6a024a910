//! Protocol constants for Fileshare.
//!
//! Contract signatures are the exact Solidity signatures of the ledger
//! contract; their Keccak-256 prefixes form the call selectors.

// ═══════════════════════════════════════════════════════════════════════════════
// CONTENT ADDRESSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Multicodec for raw binary content (CIDv1 `raw`).
pub const RAW_CODEC: u64 = 0x55;

/// Multihash code for SHA3-256.
pub const SHA3_256_CODE: u64 = 0x16;

/// Size of a SHA3-256 digest in bytes.
pub const CONTENT_DIGEST_SIZE: usize = 32;

/// Longest content address accepted from external systems.
pub const MAX_CONTENT_ADDRESS_LEN: usize = 128;

/// Default public gateway used to build content locators.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud/ipfs";

/// Pinata v3 upload endpoint.
pub const PINATA_UPLOAD_URL: &str = "https://uploads.pinata.cloud/v3/files";

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER CONTRACT
// ═══════════════════════════════════════════════════════════════════════════════

/// `mapping(address => bool) public registeredUsers`
pub const SIG_REGISTERED_USERS: &str = "registeredUsers(address)";

/// `function signup() public`
pub const SIG_SIGNUP: &str = "signup()";

/// `uint public fileCount`
pub const SIG_FILE_COUNT: &str = "fileCount()";

/// `mapping(uint => File) public files`
pub const SIG_FILES: &str = "files(uint256)";

/// `function uploadFile(string memory _name, string memory _hash) public`
pub const SIG_UPLOAD_FILE: &str = "uploadFile(string,string)";

/// Size of a contract function selector in bytes.
pub const SELECTOR_SIZE: usize = 4;

/// Size of an ABI word in bytes.
pub const ABI_WORD_SIZE: usize = 32;

/// Size of an Ethereum address in bytes (20 bytes = 160 bits).
pub const ETH_ADDRESS_SIZE: usize = 20;

/// Size of keccak256 hash output.
pub const KECCAK256_SIZE: usize = 32;

/// The zero address, returned by `files(i)` for unassigned indices.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ═══════════════════════════════════════════════════════════════════════════════
// JSON-RPC
// ═══════════════════════════════════════════════════════════════════════════════

/// Default Ethereum JSON-RPC endpoint (local development node).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// EIP-1193 error code for a signature request the user declined.
pub const EIP1193_USER_REJECTED: i64 = 4001;

/// Default interval between transaction receipt polls.
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ═══════════════════════════════════════════════════════════════════════════════
// CATALOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Default number of `getFile` calls kept in flight during a refresh.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Upper bound on refresh fetch concurrency.
pub const MAX_FETCH_CONCURRENCY: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures_unique() {
        let sigs = [
            SIG_REGISTERED_USERS,
            SIG_SIGNUP,
            SIG_FILE_COUNT,
            SIG_FILES,
            SIG_UPLOAD_FILE,
        ];

        for (i, a) in sigs.iter().enumerate() {
            for (j, b) in sigs.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b);
                }
            }
        }
    }

    #[test]
    fn test_zero_address_shape() {
        assert_eq!(ZERO_ADDRESS.len(), 2 + ETH_ADDRESS_SIZE * 2);
    }

    #[test]
    fn test_fetch_concurrency_bounds() {
        assert!(DEFAULT_FETCH_CONCURRENCY >= 1);
        assert!(DEFAULT_FETCH_CONCURRENCY <= MAX_FETCH_CONCURRENCY);
    }
}
