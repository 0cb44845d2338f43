//! `secret-keeper list` — display all secrets in a table.

use crate::cli::{output, vault_path, Cli};
use crate::errors::Result;
use crate::vault::VaultStore;

/// Execute the `list` command.  Metadata only — the vault stays locked.
pub fn execute(cli: &Cli) -> Result<()> {
    let path = vault_path(cli)?;
    let store = VaultStore::open(&path)?;

    let secrets = store.list_secrets()?;
    output::info(&format!("{} secret(s)", secrets.len()));
    output::print_secrets_table(&secrets);

    Ok(())
}
