//! Cryptographic primitives for secret-keeper.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption with per-blob salts (`encryption`)
//! - PBKDF2-HMAC-SHA-256 key derivation (`kdf`)
//! - Generated master tokens and keyfiles (`keyfile`)
//! - Best-effort secure file erasure (`erase`)

pub mod encryption;
pub mod erase;
pub mod kdf;
pub mod keyfile;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, ...};
pub use encryption::{decrypt, encrypt};
pub use erase::{secure_erase, DEFAULT_PASSES};
pub use kdf::{derive_key, generate_salt, PBKDF2_ITERATIONS};
pub use keyfile::{generate_key, generate_keyfile, load_keyfile};
pub use keys::MasterKey;
