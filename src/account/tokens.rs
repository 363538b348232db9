//! Random tokens for sessions and password resets.

use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use super::provider::ProviderError;

/// Create a new 32-byte random token, base64url encoded.
/// The raw value goes to the caller; only its hash is kept.
pub(crate) fn generate_token() -> Result<String, ProviderError> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| ProviderError::Secret(err.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a token so raw values are never stored.
pub(crate) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
