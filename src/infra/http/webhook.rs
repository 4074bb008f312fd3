//! Verification of signed CMS webhooks.

use hmac::{Hmac, Mac, digest::KeyInit};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-notion-signature";
const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header is missing")]
    Missing,
    #[error("signature header is malformed")]
    Malformed,
    #[error("signature does not match request body")]
    Mismatch,
}

/// Hex HMAC-SHA256 of `body`, in header form (`sha256=<hex>`).
pub fn sign(secret: &str, body: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", hex::encode(digest(secret, body)))
}

/// Check `header` against the HMAC of `body` in constant time.
pub fn verify(secret: &str, body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?.trim();
    let encoded = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError::Malformed)?;
    let provided = hex::decode(encoded).map_err(|_| SignatureError::Malformed)?;

    let expected = digest(secret, body);
    if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn digest(secret: &str, body: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = match <HmacSha256 as KeyInit>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    Mac::update(&mut mac, body);
    mac.finalize().into_bytes().to_vec()
}
