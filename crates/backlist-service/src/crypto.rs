//! HMAC helpers shared by webhook verification and session tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256(secret: &str, message: &[u8]) -> Vec<u8> {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104, so
    // `new_from_slice` only fails if the Hmac implementation is broken.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// HMAC-SHA256 over `message`, hex-encoded (64 characters).
///
/// This is the form Stripe uses in its `v1=` signature components.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &[u8]) -> String {
    hex::encode(hmac_sha256(secret, message))
}

/// HMAC-SHA256 over `message`, base64url-encoded without padding.
///
/// This is the form the compact session token uses for its third part.
#[must_use]
pub fn hmac_sha256_b64url(secret: &str, message: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(hmac_sha256(secret, message))
}

/// Constant-time string comparison.
///
/// Signature checks must not leak how many leading characters matched, so
/// every byte is compared regardless of where the first mismatch occurs.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}
