//! One-way token fingerprints.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the raw token.
///
/// This is the only form in which a token is stored, indexed, or logged.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
