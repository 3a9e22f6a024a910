//! Minimal ABI codec for the ledger contract.
//!
//! Covers exactly the argument and return shapes the contract uses:
//! `address`, `uint256`, `bool`, `string`, and the `(address,string,string)`
//! tuple returned by the `files` getter.

use sha3::{Digest, Keccak256};

use fileshare_core::constants::{
    ABI_WORD_SIZE, ETH_ADDRESS_SIZE, SELECTOR_SIZE, SIG_FILES, SIG_FILE_COUNT,
    SIG_REGISTERED_USERS, SIG_SIGNUP, SIG_UPLOAD_FILE,
};
use fileshare_core::error::{FileshareError, Result};
use fileshare_core::types::Identity;

/// Decoded return value of `files(uint256)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// Raw uploader address
    pub uploader: [u8; ETH_ADDRESS_SIZE],
    /// File name as recorded
    pub name: String,
    /// Content address as recorded
    pub hash: String,
}

impl FileRecord {
    /// True for the zero-valued struct a getter returns for unassigned keys.
    pub fn is_empty(&self) -> bool {
        self.uploader.iter().all(|&b| b == 0)
    }
}

/// Computes the 4-byte selector of a function signature.
pub fn selector(signature: &str) -> [u8; SELECTOR_SIZE] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; SELECTOR_SIZE];
    out.copy_from_slice(&hash[..SELECTOR_SIZE]);
    out
}

fn word_u64(value: u64) -> [u8; ABI_WORD_SIZE] {
    let mut word = [0u8; ABI_WORD_SIZE];
    word[ABI_WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_address(id: &Identity) -> Result<[u8; ABI_WORD_SIZE]> {
    let bytes = id.to_eth_bytes()?;
    let mut word = [0u8; ABI_WORD_SIZE];
    word[ABI_WORD_SIZE - ETH_ADDRESS_SIZE..].copy_from_slice(&bytes);
    Ok(word)
}

/// Length word followed by the bytes, right-padded to a word boundary.
fn string_tail(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let padded = bytes.len().div_ceil(ABI_WORD_SIZE) * ABI_WORD_SIZE;
    let mut tail = Vec::with_capacity(ABI_WORD_SIZE + padded);
    tail.extend_from_slice(&word_u64(bytes.len() as u64));
    tail.extend_from_slice(bytes);
    tail.resize(ABI_WORD_SIZE + padded, 0);
    tail
}

/// `registeredUsers(address)`
pub fn encode_registered_users(id: &Identity) -> Result<Vec<u8>> {
    let mut data = selector(SIG_REGISTERED_USERS).to_vec();
    data.extend_from_slice(&word_address(id)?);
    Ok(data)
}

/// `signup()`
pub fn encode_signup() -> Vec<u8> {
    selector(SIG_SIGNUP).to_vec()
}

/// `fileCount()`
pub fn encode_file_count() -> Vec<u8> {
    selector(SIG_FILE_COUNT).to_vec()
}

/// `files(uint256)`
pub fn encode_files(index: u64) -> Vec<u8> {
    let mut data = selector(SIG_FILES).to_vec();
    data.extend_from_slice(&word_u64(index));
    data
}

/// `uploadFile(string,string)`
pub fn encode_upload_file(name: &str, hash: &str) -> Vec<u8> {
    let name_tail = string_tail(name);
    let hash_tail = string_tail(hash);
    let head_size = 2 * ABI_WORD_SIZE;

    let mut data = selector(SIG_UPLOAD_FILE).to_vec();
    data.extend_from_slice(&word_u64(head_size as u64));
    data.extend_from_slice(&word_u64((head_size + name_tail.len()) as u64));
    data.extend_from_slice(&name_tail);
    data.extend_from_slice(&hash_tail);
    data
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8]> {
    let end = offset
        .checked_add(ABI_WORD_SIZE)
        .ok_or_else(|| FileshareError::InvalidResponse(format!("ABI offset {} overflows", offset)))?;
    data.get(offset..end).ok_or_else(|| {
        FileshareError::InvalidResponse(format!(
            "ABI data too short: need word at {}, have {} bytes",
            offset,
            data.len()
        ))
    })
}

fn uint_at(data: &[u8], offset: usize) -> Result<u64> {
    let word = word_at(data, offset)?;
    if word[..ABI_WORD_SIZE - 8].iter().any(|&b| b != 0) {
        return Err(FileshareError::InvalidResponse(
            "uint256 value exceeds 64 bits".into(),
        ));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[ABI_WORD_SIZE - 8..]);
    Ok(u64::from_be_bytes(buf))
}

fn usize_at(data: &[u8], offset: usize) -> Result<usize> {
    usize::try_from(uint_at(data, offset)?)
        .map_err(|_| FileshareError::InvalidResponse("offset exceeds usize".into()))
}

fn string_at(data: &[u8], offset: usize) -> Result<String> {
    let len = usize_at(data, offset)?;
    let range = offset
        .checked_add(ABI_WORD_SIZE)
        .and_then(|start| Some(start..start.checked_add(len)?))
        .ok_or_else(|| FileshareError::InvalidResponse(format!("string of {} bytes overflows", len)))?;
    let bytes = data.get(range).ok_or_else(|| {
        FileshareError::InvalidResponse(format!("string of {} bytes truncated", len))
    })?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| FileshareError::InvalidResponse(format!("string not UTF-8: {}", e)))
}

/// Decodes a single `bool` return value.
pub fn decode_bool(data: &[u8]) -> Result<bool> {
    match uint_at(data, 0)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(FileshareError::InvalidResponse(format!(
            "invalid bool word: {}",
            other
        ))),
    }
}

/// Decodes a single `uint256` return value that must fit in 64 bits.
pub fn decode_uint(data: &[u8]) -> Result<u64> {
    uint_at(data, 0)
}

/// Decodes the `(address,string,string)` return of `files(uint256)`.
pub fn decode_file_record(data: &[u8]) -> Result<FileRecord> {
    let address_word = word_at(data, 0)?;
    let mut uploader = [0u8; ETH_ADDRESS_SIZE];
    uploader.copy_from_slice(&address_word[ABI_WORD_SIZE - ETH_ADDRESS_SIZE..]);

    let name_offset = usize_at(data, ABI_WORD_SIZE)?;
    let hash_offset = usize_at(data, 2 * ABI_WORD_SIZE)?;

    Ok(FileRecord {
        uploader,
        name: string_at(data, name_offset)?,
        hash: string_at(data, hash_offset)?,
    })
}

/// Encodes a `(address,string,string)` tuple as a contract would return it.
///
/// Used by tests and mock nodes.
pub fn encode_file_record(record: &FileRecord) -> Vec<u8> {
    let name_tail = string_tail(&record.name);
    let hash_tail = string_tail(&record.hash);
    let head_size = 3 * ABI_WORD_SIZE;

    let mut address_word = [0u8; ABI_WORD_SIZE];
    address_word[ABI_WORD_SIZE - ETH_ADDRESS_SIZE..].copy_from_slice(&record.uploader);

    let mut data = Vec::with_capacity(head_size + name_tail.len() + hash_tail.len());
    data.extend_from_slice(&address_word);
    data.extend_from_slice(&word_u64(head_size as u64));
    data.extend_from_slice(&word_u64((head_size + name_tail.len()) as u64));
    data.extend_from_slice(&name_tail);
    data.extend_from_slice(&hash_tail);
    data
}

/// Encodes a single `uint256` return value.
pub fn encode_uint_return(value: u64) -> Vec<u8> {
    word_u64(value).to_vec()
}
