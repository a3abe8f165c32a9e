//! Guest link tokens.
//!
//! Only the SHA-256 hash of a token is stored. The plain token is handed
//! out once, when the link is created or rotated.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per token (64 hex characters).
const TOKEN_BYTES: usize = 32;

/// Generates a cryptographically secure random token for guest links.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a token for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
