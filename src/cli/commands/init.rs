//! `secret-keeper init` — create a new vault.

use crate::cli::{gitignore, output, prompt_new_master_key, vault_path, Cli};
use crate::crypto::keyfile;
use crate::errors::Result;
use crate::vault::{paths, VaultStore};

/// Execute the `init` command.
pub fn execute(cli: &Cli, generate_key: bool) -> Result<()> {
    let path = vault_path(cli)?;

    let key = if generate_key {
        let keyfile_path = paths::keyfile_path(&path);
        let token = keyfile::generate_keyfile(&keyfile_path)?;
        output::success(&format!("Generated keyfile at {}", keyfile_path.display()));
        token
    } else {
        prompt_new_master_key()?
    };

    let store = VaultStore::initialize(&path, key.as_bytes())?;

    // The vault directory must never reach version control.
    if let Some(vault_dir) = path.parent() {
        gitignore::write_vault_gitignore(vault_dir);
        if let Some(project_dir) = vault_dir.parent() {
            if project_dir != paths::home_dir()? {
                gitignore::patch_gitignore(project_dir, ".secret-keeper/");
            }
        }
    }

    output::success(&format!("Vault initialized at {}", store.path().display()));
    output::tip("Add a secret: secret-keeper set <NAME>");

    Ok(())
}
