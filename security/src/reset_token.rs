// security/src/reset_token.rs

use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

const RESET_TOKEN_BYTES: usize = 32;

/// A freshly minted reset token. Only `digest` is ever stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub raw: String,
    pub digest: String,
}

impl ResetToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let raw: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        let digest = digest(&raw);
        Self { raw, digest }
    }
}

/// SHA-256 of the raw token, hex encoded.
pub fn digest(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}
