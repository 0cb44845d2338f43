//! AES-256-GCM authenticated encryption over password-derived keys.
//!
//! Each call to `encrypt` draws a fresh 32-byte salt and a fresh 12-byte
//! nonce, derives a one-shot AES-256 key from the caller's key material,
//! and returns everything as a single base64 blob.  `decrypt` reverses
//! the process.
//!
//! Layout of the decoded blob:
//!   [ 32-byte salt | 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroize;

use super::kdf::{derive_key, generate_salt, SALT_LEN};
use crate::errors::{Result, SecretKeeperError};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// Minimum decoded blob length: salt + nonce + tag.
const MIN_BLOB_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Encrypt `plaintext` under a key derived from `key_material`.
///
/// Returns a base64 string of salt || nonce || ciphertext+tag.
pub fn encrypt(plaintext: &[u8], key_material: &[u8]) -> Result<String> {
    let salt = generate_salt();
    let mut key = derive_key(key_material, &salt);

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| SecretKeeperError::EncryptionFailed(format!("invalid key length: {e}")))?;
    key.zeroize();

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| SecretKeeperError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(blob))
}

/// Decrypt a blob produced by `encrypt`.
///
/// Every failure cause — bad base64, short blob, wrong key, corrupted
/// ciphertext — collapses to `InvalidKey` so callers cannot build a
/// decryption oracle out of the error variants.
pub fn decrypt(blob: &str, key_material: &[u8]) -> Result<Vec<u8>> {
    let data = BASE64
        .decode(blob.trim())
        .map_err(|_| SecretKeeperError::InvalidKey)?;

    if data.len() < MIN_BLOB_LEN {
        return Err(SecretKeeperError::InvalidKey);
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let mut key = derive_key(key_material, salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SecretKeeperError::InvalidKey)?;
    key.zeroize();

    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| SecretKeeperError::InvalidKey)
}
