//! Whole-file SHA-256 digests, used for the optional checksum sidecar.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK: usize = 8 * 1024;

/// Lowercase hex SHA-256 of the file's bytes, read in chunks.
pub fn file_digest(path: impl AsRef<Path>) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn verify_file(path: impl AsRef<Path>, expected_hex: &str) -> io::Result<bool> {
    let actual = file_digest(path)?;
    Ok(actual.eq_ignore_ascii_case(expected_hex.trim()))
}
