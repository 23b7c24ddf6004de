//! Salted password digests.
//!
//! A password is stored as a [`CredentialEntry`]: a fresh random salt and the
//! hex SHA-1 of `password ‖ salt`. The clear-text password is never kept.
//! Seeded and registered accounts share this format, so the digest cannot
//! change without rewriting existing rows.

use anyhow::{Context, Result};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Salt length in raw bytes (hex-encoded to twice as many characters).
pub const SALT_LEN: usize = 8;

/// Stored form of a password. `hash` is meaningless without `salt`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    pub salt: String,
    pub hash: String,
}

impl CredentialEntry {
    /// Check a candidate clear-text password against this entry.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        verify(&self.hash, &self.salt, candidate)
    }
}

/// Derive a new entry with a freshly generated salt.
///
/// # Errors
/// Returns an error if the operating system randomness source is unavailable.
pub fn derive(clear_text: &str) -> Result<CredentialEntry> {
    let mut bytes = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate password salt")?;
    Ok(derive_with_salt(clear_text, &hex::encode(bytes)))
}

/// Recompute the digest for `candidate` and compare it to `stored_hash`.
#[must_use]
pub fn verify(stored_hash: &str, stored_salt: &str, candidate: &str) -> bool {
    let computed = digest(candidate, stored_salt);
    constant_time_eq(computed.as_bytes(), stored_hash.as_bytes())
}

pub(crate) fn derive_with_salt(clear_text: &str, salt: &str) -> CredentialEntry {
    CredentialEntry {
        salt: salt.to_string(),
        hash: digest(clear_text, salt),
    }
}

fn digest(clear_text: &str, salt: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(clear_text.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
