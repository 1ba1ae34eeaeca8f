//! SHA-256 digests and their 64-character hex rendering.

use crate::constants::{HASH_HEX_SIZE, HASH_SIZE};
use crate::Hash;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Previous-hash sentinel carried by every genesis block.
pub const GENESIS_PREVIOUS_HASH: Hash = [0u8; HASH_SIZE];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HashParseError {
    #[error("expected {HASH_HEX_SIZE} hex characters, got {0}")]
    Length(usize),
    #[error("invalid hex digest: {0}")]
    Hex(#[from] hex::FromHexError),
}

pub fn digest(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    finalize(hasher)
}

/// Hex form of [`digest`]; always 64 lowercase characters.
pub fn digest_hex(bytes: &[u8]) -> String {
    to_hex(&digest(bytes))
}

pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

pub fn parse_hex(s: &str) -> Result<Hash, HashParseError> {
    if s.len() != HASH_HEX_SIZE {
        return Err(HashParseError::Length(s.len()));
    }
    let mut out = [0u8; HASH_SIZE];
    hex::decode_to_slice(s, &mut out)?;
    Ok(out)
}

pub(crate) fn finalize(hasher: Sha256) -> Hash {
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest[..]);
    out
}
