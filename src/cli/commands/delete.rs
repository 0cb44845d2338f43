//! `secret-keeper delete` — remove a secret from the vault.

use crate::cli::{open_unlocked, output, Cli};
use crate::errors::{Result, SecretKeeperError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    if !force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete secret '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| SecretKeeperError::CommandFailed(format!("confirm prompt: {e}")))?;
        if !confirmed {
            return Err(SecretKeeperError::UserCancelled);
        }
    }

    let mut store = open_unlocked(cli)?;
    store.delete_secret(name)?;

    output::success(&format!("Secret '{name}' deleted"));
    Ok(())
}
