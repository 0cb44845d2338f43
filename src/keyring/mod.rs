//! OS keyring integration for master-key caching.
//!
//! Stores and retrieves the vault master key from the operating
//! system's secure credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! All operations fail gracefully — if the keyring is unavailable, the
//! error is returned and the caller falls back to the keyfile or a
//! prompt.

use crate::errors::{Result, SecretKeeperError};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "secret-keeper";

/// Build a keyring entry key from a vault path.
fn entry_key(vault_path: &str) -> String {
    format!("vault:{vault_path}")
}

/// Store a master key in the OS keyring for a specific vault.
pub fn store_key(vault_path: &str, key: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(vault_path))
        .map_err(|e| SecretKeeperError::KeyringError(format!("failed to create keyring entry: {e}")))?;

    entry
        .set_password(key)
        .map_err(|e| SecretKeeperError::KeyringError(format!("failed to store key in keyring: {e}")))?;

    Ok(())
}

/// Retrieve a master key from the OS keyring for a specific vault.
///
/// Returns `None` if no key is stored (rather than an error).
pub fn get_key(vault_path: &str) -> Result<Option<String>> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(vault_path))
        .map_err(|e| SecretKeeperError::KeyringError(format!("failed to create keyring entry: {e}")))?;

    match entry.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(SecretKeeperError::KeyringError(format!(
            "failed to read from keyring: {e}"
        ))),
    }
}

/// Delete a stored master key from the OS keyring.
pub fn delete_key(vault_path: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(vault_path))
        .map_err(|e| SecretKeeperError::KeyringError(format!("failed to create keyring entry: {e}")))?;

    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine.
        Err(e) => Err(SecretKeeperError::KeyringError(format!(
            "failed to delete from keyring: {e}"
        ))),
    }
}
