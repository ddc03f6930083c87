//! HMAC-SHA256 signing for webhook payloads.
//!
//! The signature scheme:
//! - Signature is computed over: `{timestamp}.{payload}`
//! - The key is the configured shared secret, used as raw UTF-8 bytes
//! - The signature is the lowercase hex-encoded HMAC-SHA256 digest
//! - Headers: `X-Docling-Timestamp` (unix seconds), `X-Docling-Signature`
//!
//! Payloads sent without a secret carry no signature header and should be
//! treated as untrusted by receivers.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "x-docling-signature";

/// Header carrying the unix timestamp the signature was computed with.
pub const TIMESTAMP_HEADER: &str = "x-docling-timestamp";

fn signed_content(timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let prefix = format!("{}.", timestamp);
    let mut content = Vec::with_capacity(prefix.len() + payload.len());
    content.extend_from_slice(prefix.as_bytes());
    content.extend_from_slice(payload);
    content
}

fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(message);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Sign a webhook payload.
///
/// # Arguments
///
/// * `timestamp` - Unix timestamp in seconds, sent alongside as `X-Docling-Timestamp`
/// * `payload` - The exact JSON body bytes that go on the wire
/// * `secret` - The shared secret
///
/// # Returns
///
/// The hex-encoded HMAC-SHA256 of `{timestamp}.{payload}`.
pub fn sign_payload(timestamp: i64, payload: &[u8], secret: &str) -> Option<String> {
    hmac_sha256_hex(secret.as_bytes(), &signed_content(timestamp, payload))
}

/// Verify a webhook signature, for receivers.
///
/// Returns `true` if `signature` is the hex HMAC of `{timestamp}.{payload}`
/// under `secret`. Comparison is constant-time.
pub fn verify_signature(timestamp: i64, payload: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(&signed_content(timestamp, payload));

    mac.verify_slice(&expected).is_ok()
}
