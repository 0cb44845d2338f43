//! `secret-keeper auth` — manage authentication material.

use crate::cli::{output, vault_path, Cli};
use crate::crypto::keyfile;
use crate::errors::Result;
use crate::vault::paths;

/// `auth keyfile-generate` — create a keyfile with a fresh master key.
///
/// Intended for brand-new vaults: generate the keyfile first, then run
/// `init` (which picks it up automatically).
pub fn keyfile_generate(cli: &Cli) -> Result<()> {
    let db_path = vault_path(cli)?;
    let keyfile_path = paths::keyfile_path(&db_path);

    keyfile::generate_keyfile(&keyfile_path)?;

    output::success(&format!("Keyfile generated at {}", keyfile_path.display()));
    output::warning("Anyone who can read this file can unlock the vault. Back it up safely.");

    Ok(())
}

/// `auth keyring` — store or remove the master key in the OS keyring.
#[cfg(feature = "keyring-store")]
pub fn keyring(cli: &Cli, delete: bool) -> Result<()> {
    use crate::cli::resolve_master_key;

    let db_path = vault_path(cli)?;
    let vault_id = db_path.to_string_lossy().into_owned();

    if delete {
        crate::keyring::delete_key(&vault_id)?;
        output::success("Master key removed from the OS keyring.");
        return Ok(());
    }

    let key = resolve_master_key(&db_path, true)?;
    crate::keyring::store_key(&vault_id, &key)?;
    output::success("Master key saved to the OS keyring.");

    Ok(())
}
