//! Opaque credential hashing: salted HMAC-SHA256 with constant-time
//! verification. Nothing outside this module interprets the stored hash.

use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SALT_LEN: usize = 16;

/// Hash `password` with a fresh random salt.
/// Returns `(hash_hex, salt_hex)` for storage.
pub fn hash_password(password: &str) -> (String, String) {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = digest(&salt, password);
    (hex::encode(digest), hex::encode(salt))
}

/// Verify `password` against a stored hash/salt pair.
/// Comparison is constant-time (`Mac::verify_slice`).
pub fn verify_password(password: &str, hash_hex: &str, salt_hex: &str) -> bool {
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return false;
    };
    let mut mac = match HmacSha256::new_from_slice(&salt) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(password.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    // HMAC keys of any length are accepted.
    let mut mac = HmacSha256::new_from_slice(salt).expect("HMAC accepts any key length");
    mac.update(password.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let (hash, salt) = hash_password("hunter22");
        assert!(verify_password("hunter22", &hash, &salt));
        assert!(!verify_password("hunter23", &hash, &salt));
    }

    #[test]
    fn salts_differ_between_calls() {
        let (hash_a, salt_a) = hash_password("same");
        let (hash_b, salt_b) = hash_password("same");
        assert_ne!(salt_a, salt_b);
        assert_ne!(hash_a, hash_b);
    }

    #[test]
    fn garbage_stored_values_never_verify() {
        assert!(!verify_password("pw", "not-hex", "also-not-hex"));
    }
}
