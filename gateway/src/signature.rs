//! Webhook signature checks.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Hex encoded HMAC-SHA512 of the body.
pub fn hmac_sha512_hex(secret: &[u8], body: &[u8]) -> String {
    // hmac accepts keys of any length
    let mut mac = match HmacSha512::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex HMAC-SHA512 signature in constant time.
pub fn verify_hmac_sha512(secret: &[u8], body: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Check a presented shared secret, such as the Flutterwave `verif-hash`.
/// Both values key an HMAC over the same label and the tags are compared
/// with `verify_slice`, so the comparison is constant time.
pub fn verify_shared_secret(secret: &[u8], presented: &[u8]) -> bool {
    if secret.is_empty() {
        return false;
    }
    let (Ok(mut expected), Ok(mut given)) = (
        HmacSha512::new_from_slice(secret),
        HmacSha512::new_from_slice(presented),
    ) else {
        return false;
    };
    expected.update(b"webhook-secret");
    given.update(b"webhook-secret");
    expected.verify_slice(&given.finalize().into_bytes()).is_ok()
}
