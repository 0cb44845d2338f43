//! `secret-keeper destroy` — securely erase a vault.
//!
//! A vault is never re-created in place; a reset is destroy followed by
//! a fresh `init`.  The database (with its WAL sidecars) and any keyfile
//! are overwritten before unlinking.

use crate::cli::{output, vault_path, Cli};
use crate::config::Settings;
use crate::crypto::secure_erase;
use crate::errors::{Result, SecretKeeperError};
use crate::vault::{paths, VaultStore};

/// Execute the `destroy` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let db_path = vault_path(cli)?;
    if !VaultStore::is_initialized(&db_path) {
        return Err(SecretKeeperError::VaultNotInitialized(db_path));
    }

    if !force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Destroy the vault at {}? This cannot be undone",
                db_path.display()
            ))
            .default(false)
            .interact()
            .map_err(|e| SecretKeeperError::CommandFailed(format!("confirm prompt: {e}")))?;
        if !confirmed {
            return Err(SecretKeeperError::UserCancelled);
        }
    }

    let base_dir = db_path
        .parent()
        .and_then(|p| p.parent())
        .map(std::path::Path::to_path_buf)
        .unwrap_or(std::env::current_dir()?);
    let passes = Settings::load(&base_dir)?.erase_passes;

    let mut clean = secure_erase(&db_path, passes);
    for sidecar in ["secrets.db-wal", "secrets.db-shm"] {
        let path = db_path.with_file_name(sidecar);
        if path.exists() {
            clean &= secure_erase(&path, passes);
        }
    }

    let keyfile = paths::keyfile_path(&db_path);
    if keyfile.exists() {
        clean &= secure_erase(&keyfile, passes);
    }

    if clean {
        output::success("Vault destroyed (files overwritten and unlinked).");
    } else {
        output::warning("Vault removed, but some files could not be fully overwritten.");
    }
    output::tip("Start over with `secret-keeper init`.");

    Ok(())
}
