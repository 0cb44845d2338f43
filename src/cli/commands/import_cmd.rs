//! `secret-keeper import` — import secrets from a .env file.

use std::fs;
use std::path::Path;

use crate::cli::{open_unlocked, output, Cli};
use crate::errors::{Result, SecretKeeperError};

/// Execute the `import` command.
pub fn execute(cli: &Cli, file_path: &str, secrets_only: bool) -> Result<()> {
    let source = Path::new(file_path);
    if !source.exists() {
        return Err(SecretKeeperError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }

    let content = fs::read_to_string(source)?;
    let mut store = open_unlocked(cli)?;
    let summary = store.import_from_env(&content, secrets_only)?;

    for name in &summary.secrets {
        output::info(&format!("  + {name} (sensitive)"));
    }
    for name in &summary.credentials {
        output::info(&format!("  + {name} (credential)"));
    }
    for name in &summary.skipped {
        output::tip(&format!("  skipped {name}"));
    }

    output::success(&format!(
        "Imported {} secrets and {} credentials from {} ({} skipped)",
        summary.secrets.len(),
        summary.credentials.len(),
        source.display(),
        summary.skipped.len(),
    ));

    Ok(())
}
