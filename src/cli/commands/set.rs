//! `secret-keeper set` — add or update a secret in the vault.

use std::io::{self, IsTerminal, Read};

use crate::cli::{open_unlocked, output, Cli};
use crate::errors::Result;
use crate::vault::{SecretOptions, Sensitivity};

/// Execute the `set` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    value: Option<&str>,
    description: Option<&str>,
    tags: &[String],
    credential: bool,
) -> Result<()> {
    // Determine the secret value from one of three sources.
    let secret_value = if let Some(v) = value {
        // Source 1: Inline value on the command line.
        output::warning("Value provided on command line — it may appear in shell history.");
        v.to_string()
    } else if !io::stdin().is_terminal() {
        // Source 2: Piped input (stdin is not a terminal).
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        // Source 3: Interactive secure prompt (default).
        dialoguer::Password::new()
            .with_prompt(format!("Enter value for {name}"))
            .interact()
            .map_err(|e| crate::errors::SecretKeeperError::CommandFailed(format!("input prompt: {e}")))?
    };

    let mut store = open_unlocked(cli)?;

    let opts = SecretOptions {
        description: description.map(str::to_string),
        tags: tags.to_vec(),
        sensitivity: Some(if credential {
            Sensitivity::Credential
        } else {
            Sensitivity::Sensitive
        }),
    };
    store.add_secret(name, &secret_value, &opts)?;

    output::success(&format!(
        "Secret '{}' stored ({} total)",
        name,
        store.count_secrets()?
    ));
    output::tip("Run a command with secrets: secret-keeper exec -- <command>");

    Ok(())
}
