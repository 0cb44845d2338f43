//! Vault path resolution — project-local vs. global.
//!
//! A vault lives at `<base>/.secret-keeper/secrets.db`.  The base is the
//! project directory when one is given (or when a local vault already
//! exists under the current working directory), otherwise `$HOME`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Result, SecretKeeperError};

/// Directory name holding the vault inside a base directory.
pub const VAULT_DIR_NAME: &str = ".secret-keeper";

/// Database file name inside the vault directory.
pub const VAULT_DB_NAME: &str = "secrets.db";

/// Keyfile name inside the vault directory.
pub const KEYFILE_NAME: &str = ".keyfile";

/// Build the vault database path under a base directory.
pub fn vault_db_path(base: &Path) -> PathBuf {
    base.join(VAULT_DIR_NAME).join(VAULT_DB_NAME)
}

/// Build the keyfile path next to a vault database.
pub fn keyfile_path(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .map(|dir| dir.join(KEYFILE_NAME))
        .unwrap_or_else(|| PathBuf::from(KEYFILE_NAME))
}

/// Resolve the vault path for an invocation.
///
/// - `project` set or `force_local` true: `<base>/.secret-keeper/secrets.db`
///   where `<base>` is the project path or the current directory.
/// - Otherwise, a local vault under the cwd wins if it exists.
/// - Otherwise, the global vault under `$HOME`.
pub fn resolve_vault_path(project: Option<&Path>, force_local: bool) -> Result<PathBuf> {
    if let Some(dir) = project {
        return Ok(vault_db_path(dir));
    }

    let cwd = std::env::current_dir()?;
    if force_local {
        return Ok(vault_db_path(&cwd));
    }

    let local = vault_db_path(&cwd);
    if local.exists() {
        return Ok(local);
    }

    Ok(vault_db_path(&home_dir()?))
}

/// Returns `$HOME` as a path.
pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| SecretKeeperError::ConfigError("HOME is not set".into()))
}

/// Create the vault directory for `db_path` with mode 0700.
pub fn ensure_vault_dir(db_path: &Path) -> Result<PathBuf> {
    let dir = db_path
        .parent()
        .ok_or_else(|| SecretKeeperError::ConfigError("vault path has no parent".into()))?;

    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }

    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn project_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = resolve_vault_path(Some(dir.path()), false).unwrap();
        assert_eq!(path, dir.path().join(".secret-keeper/secrets.db"));
    }

    #[test]
    fn keyfile_sits_next_to_db() {
        let db = Path::new("/base/.secret-keeper/secrets.db");
        assert_eq!(
            keyfile_path(db),
            Path::new("/base/.secret-keeper/.keyfile")
        );
    }

    #[cfg(unix)]
    #[test]
    fn ensure_vault_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let db = vault_db_path(dir.path());
        let created = ensure_vault_dir(&db).unwrap();

        let mode = fs::metadata(&created).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
