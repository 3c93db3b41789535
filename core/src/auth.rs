use rand::Rng;
use sha2::{Digest, Sha256};

/// Prefix of keys generated for local development.
pub const DEV_KEY_PREFIX: &str = "dev_";

/// Generate a development API key. Returns `(full_key, sha256_hash)`.
/// Key format: `dev_` + 16 random bytes hex-encoded.
pub fn generate_dev_api_key() -> (String, String) {
    let full_key = format!("{DEV_KEY_PREFIX}{}", random_hex(16));
    let hash = hash_token(&full_key);
    (full_key, hash)
}

/// SHA-256 hex digest of a token string.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// First 8 characters of a key, for log lines that must not leak the secret.
pub fn key_prefix(full_key: &str) -> String {
    full_key.chars().take(8).collect()
}

/// Generate `n` random bytes and return as hex string.
fn random_hex(n: usize) -> String {
    let bytes: Vec<u8> = (0..n).map(|_| rand::thread_rng().r#gen::<u8>()).collect();
    hex::encode(&bytes)
}
