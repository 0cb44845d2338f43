//! `secret-keeper change-key` — change the vault master key.
//!
//! Every secret is re-encrypted under the new key inside a single
//! transaction; a failure leaves the old key authoritative.

use crate::cli::{output, prompt_new_master_key, resolve_master_key, vault_path, Cli};
use crate::errors::Result;
use crate::vault::VaultStore;

/// Execute the `change-key` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let path = vault_path(cli)?;

    output::info("Enter your current vault master key.");
    let old_key = resolve_master_key(&path, true)?;

    let mut store = VaultStore::open(&path)?;
    store.load_key(old_key.as_bytes())?;

    output::info("Choose your new vault master key.");
    let new_key = prompt_new_master_key()?;

    store.change_master_key(old_key.as_bytes(), new_key.as_bytes())?;

    output::success(&format!(
        "Master key changed ({} secrets re-encrypted)",
        store.count_secrets()?
    ));
    output::tip("A running daemon keeps its loaded secrets; restart it to pick up the new key.");

    Ok(())
}
