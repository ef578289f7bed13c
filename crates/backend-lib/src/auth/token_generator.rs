// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Secure random values for credentials
This module provides the random token identifiers (`jti`) embedded in every
issued credential, plus the comparison used for presented token values. */
use rand::{rngs::OsRng, RngCore};

/// Default token id size in bytes (16 bytes = 128 bits of entropy)
const DEFAULT_TOKEN_ID_BYTES: usize = 16;

/** Generate a cryptographically secure random token id
Two credentials minted for the same user in the same second still differ
because each carries one of these.
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_token_id() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_ID_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

/// Compare two token values without short-circuiting on the first difference
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
