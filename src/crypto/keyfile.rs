//! Keyfile handling for non-interactive vault unlock.
//!
//! A keyfile carries a generated master token (24 random bytes encoded
//! as URL-safe base64) so the daemon can start without a password
//! prompt.  The file lives next to the vault as `.keyfile` with
//! owner-only permissions.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::errors::{Result, SecretKeeperError};

/// Raw entropy drawn for a generated master token.
const TOKEN_ENTROPY_LEN: usize = 24;

/// Generate a new printable master token: 24 random bytes, URL-safe base64.
pub fn generate_key() -> Zeroizing<String> {
    let mut bytes = [0u8; TOKEN_ENTROPY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Zeroizing::new(URL_SAFE_NO_PAD.encode(bytes))
}

/// Generate a master token and persist it to `path` with mode 0600.
///
/// Returns the token so the caller can use it immediately.
pub fn generate_keyfile(path: &Path) -> Result<Zeroizing<String>> {
    if path.exists() {
        return Err(SecretKeeperError::KeyfileError(format!(
            "keyfile already exists at {}",
            path.display()
        )));
    }

    let token = generate_key();

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                SecretKeeperError::KeyfileError(format!("cannot create keyfile directory: {e}"))
            })?;
        }
    }

    fs::write(path, token.as_bytes())
        .map_err(|e| SecretKeeperError::KeyfileError(format!("failed to write keyfile: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            SecretKeeperError::KeyfileError(format!("failed to set keyfile permissions: {e}"))
        })?;
    }

    Ok(token)
}

/// Load a master token from a keyfile.
pub fn load_keyfile(path: &Path) -> Result<Zeroizing<String>> {
    if !path.exists() {
        return Err(SecretKeeperError::KeyfileError(format!(
            "keyfile not found at {}",
            path.display()
        )));
    }

    let data = fs::read_to_string(path)
        .map_err(|e| SecretKeeperError::KeyfileError(format!("failed to read keyfile: {e}")))?;

    let token = data.trim();
    if token.is_empty() {
        return Err(SecretKeeperError::KeyfileError(format!(
            "keyfile at {} is empty",
            path.display()
        )));
    }

    Ok(Zeroizing::new(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generate_key_is_printable_and_random() {
        let t1 = generate_key();
        let t2 = generate_key();
        assert_ne!(*t1, *t2);
        assert!(t1.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        // 24 bytes -> 32 base64 chars without padding.
        assert_eq!(t1.len(), 32);
    }

    #[test]
    fn generate_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".keyfile");

        let generated = generate_keyfile(&path).unwrap();
        let loaded = load_keyfile(&path).unwrap();
        assert_eq!(*generated, *loaded);
    }

    #[test]
    fn generate_fails_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".keyfile");

        generate_keyfile(&path).unwrap();
        assert!(generate_keyfile(&path).is_err());
    }

    #[test]
    fn load_fails_if_missing() {
        let dir = TempDir::new().unwrap();
        assert!(load_keyfile(&dir.path().join("nope")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn keyfile_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".keyfile");
        generate_keyfile(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
