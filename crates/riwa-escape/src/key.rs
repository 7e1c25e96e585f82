//! Coordinate key verification.
//!
//! The expected key is fixed for the universe: a master formula compared
//! by SHA-256 digest. Clues collected by an entity are lore only and do
//! not change what the verifier accepts.

use sha2::{Digest, Sha256};

/// The formula locked in the universe core.
pub const MASTER_KEY_FORMULA: &str = "key_formula_locked_in_universe_core";

/// Checks provided keys against the digest of a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVerifier {
    expected_digest: String,
}

impl Default for KeyVerifier {
    fn default() -> Self {
        Self::master()
    }
}

impl KeyVerifier {
    /// Verifier for an arbitrary formula.
    pub fn new(formula: &str) -> Self {
        Self {
            expected_digest: digest(formula),
        }
    }

    /// Verifier for [`MASTER_KEY_FORMULA`].
    pub fn master() -> Self {
        Self::new(MASTER_KEY_FORMULA)
    }

    /// Whether `key` hashes to the expected digest.
    pub fn verify(&self, key: &str) -> bool {
        digest(key) == self.expected_digest
    }

    /// Hex digest the verifier expects.
    pub fn expected_digest(&self) -> &str {
        &self.expected_digest
    }
}

/// Lowercase hex SHA-256 digest of `input`.
pub fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
