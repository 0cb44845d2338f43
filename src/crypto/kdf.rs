//! Password-based key derivation using PBKDF2-HMAC-SHA-256.
//!
//! Every encrypted blob carries its own random salt, so the symmetric
//! key is re-derived per entry and never cached across entries.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Derive a 32-byte symmetric key from key material and a salt.
///
/// The same key material + salt always produces the same key.
pub fn derive_key(key_material: &[u8], salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(key_material, salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [0x42u8; SALT_LEN];
        let k1 = derive_key(b"correct horse", &salt);
        let k2 = derive_key(b"correct horse", &salt);
        assert_eq!(k1, k2);
    }

    #[test]
    fn derive_key_differs_with_salt() {
        let k1 = derive_key(b"pw", &[0x01u8; SALT_LEN]);
        let k2 = derive_key(b"pw", &[0x02u8; SALT_LEN]);
        assert_ne!(k1, k2);
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
