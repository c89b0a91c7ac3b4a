use sha2::{Digest, Sha256};

/// Compute SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a raw 32-byte hash as a lowercase hex string (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content-addressed blob key for an artifact of one photo.
/// Layout: `<folder>/<first_2_hex_chars>/<full_hex><suffix>`
pub fn blob_key(folder: &str, hash_hex: &str, suffix: &str) -> String {
    let shard = hash_hex.get(..2).unwrap_or(hash_hex);
    format!("{folder}/{shard}/{hash_hex}{suffix}")
}
