//! Hash utilities

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Scheme tag of stored credential hashes
pub const PASSWORD_SCHEME: &str = "hmac-sha256";

/// Salt length for credential hashes
pub const SALT_LEN: usize = 16;

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

pub fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Compare two byte strings without an early exit on the first mismatch
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}

/// Hash a credential for storage: `hmac-sha256$<salt hex>$<digest hex>`
pub fn hash_password(secret: &[u8]) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    hash_password_with_salt(secret, &salt)
}

pub fn hash_password_with_salt(secret: &[u8], salt: &[u8]) -> String {
    format!(
        "{}${}${}",
        PASSWORD_SCHEME,
        hex::encode(salt),
        hmac_sha256_hex(salt, secret)
    )
}

/// Check `secret` against a stored credential hash.
///
/// Malformed or foreign-scheme hashes never verify.
pub fn verify_password(secret: &[u8], stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt_hex), Some(digest_hex)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    if scheme != PASSWORD_SCHEME {
        return false;
    }

    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };

    constant_time_eq(&hmac_sha256(&salt, secret), &expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password(b"password123");

        assert!(stored.starts_with("hmac-sha256$"));
        assert!(verify_password(b"password123", &stored));
        assert!(!verify_password(b"password124", &stored));
        assert!(!verify_password(b"", &stored));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password(b"same");
        let b = hash_password(b"same");
        assert_ne!(a, b);
        assert!(verify_password(b"same", &a));
        assert!(verify_password(b"same", &b));
    }

    #[test]
    fn test_legacy_schemes_never_verify() {
        // Unsalted SHA-256 as stored by older deployments
        let legacy = hex::encode(Sha256::digest(b"password123"));
        assert!(!verify_password(b"password123", &legacy));
        assert!(!verify_password(b"password123", "md4$00$00"));
        assert!(!verify_password(b"password123", "hmac-sha256$zz$zz"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
