//! BLAKE3 hashing utilities for package integrity
//!
//! Manifests record archive hashes as bare lowercase hex. Hashes carrying
//! the `blake3:` prefix are accepted wherever a hash is compared.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake3::Hasher;

use crate::error::{Result, fs::read_failed};

/// Optional prefix accepted on recorded hashes
pub const HASH_PREFIX: &str = "blake3:";

/// Hex BLAKE3 hash and byte length of a file
pub fn hash_file(path: &Path) -> Result<(String, u64)> {
    let file = File::open(path).map_err(|e| read_failed(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];
    let mut size = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| read_failed(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok((hasher.finalize().to_hex().to_string(), size))
}

/// Hex BLAKE3 hash of an in-memory buffer
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Verify a hash matches the expected value
pub fn verify_hash(expected: &str, actual: &str) -> bool {
    let normalize = |h: &str| h.trim().trim_start_matches(HASH_PREFIX).to_ascii_lowercase();
    normalize(expected) == normalize(actual)
}
