//! `secret-keeper audit` — view the vault's audit log.

use crate::cli::{output, vault_path, Cli};
use crate::errors::Result;
use crate::vault::VaultStore;

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize) -> Result<()> {
    let path = vault_path(cli)?;
    let store = VaultStore::open(&path)?;
    let entries = store.audit_entries(last)?;

    if entries.is_empty() {
        output::info("Audit log is empty.");
        return Ok(());
    }

    for entry in &entries {
        let name = entry.secret_name.as_deref().unwrap_or("-");
        let details = entry.details.as_deref().unwrap_or("");
        println!(
            "{}  {:<20} {:<24} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            name,
            details
        );
    }

    Ok(())
}
