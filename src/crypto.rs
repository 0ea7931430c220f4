//! Credential derivation and token generation.
//!
//! Passwords are never stored; each user row carries a random salt and a
//! PBKDF2-HMAC-SHA256 derivation of the password over that salt. Bearer
//! tokens are random bytes, hex-encoded.

use sha2::Sha256;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes.
pub const KEY_LEN: usize = 32;

/// Bearer token length in bytes (hex-encoded to twice this many chars).
pub const TOKEN_LEN: usize = 16;

/// Default PBKDF2 iteration count. Overridable via `[security]` config.
pub const DEFAULT_ITERATIONS: u32 = 1024;

/// A salt and the hash derived from it.
#[derive(Debug, Clone)]
pub struct DerivedSecret {
    pub salt: Vec<u8>,
    pub hash: Vec<u8>,
}

/// Derive a fresh secret from a password with a random salt.
#[must_use]
pub fn derive_secret(password: &str, iterations: u32) -> DerivedSecret {
    use rand::Rng;

    let salt: [u8; SALT_LEN] = rand::rng().random();
    let hash = derive_with_salt(password, &salt, iterations);

    DerivedSecret {
        salt: salt.to_vec(),
        hash,
    }
}

/// Derive a key from a password and an existing salt.
#[must_use]
pub fn derive_with_salt(password: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key.to_vec()
}

/// Re-derive with the stored salt and compare against the expected hash.
///
/// The comparison does not short-circuit on the first differing byte.
#[must_use]
pub fn verify_password(password: &str, salt: &[u8], expected: &[u8], iterations: u32) -> bool {
    let actual = derive_with_salt(password, salt, iterations);
    constant_time_eq(&actual, expected)
}

/// Generate a random bearer token (32-char hex string).
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let bytes: [u8; TOKEN_LEN] = rand::rng().random();
    hex::encode(bytes)
}

/// Constant-time byte comparison.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
