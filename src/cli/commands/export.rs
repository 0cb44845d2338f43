//! `secret-keeper export` — export secrets as .env lines.

use std::fs;

use crate::cli::{open_unlocked, output, Cli};
use crate::errors::Result;

/// Execute the `export` command.
pub fn execute(cli: &Cli, output_path: Option<&str>) -> Result<()> {
    let store = open_unlocked(cli)?;
    let content = store.export_env()?;

    match output_path {
        Some(path) => {
            fs::write(path, &content)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
            }
            output::success(&format!("Exported {} secrets to {path}", store.count_secrets()?));
        }
        None => print!("{content}"),
    }

    Ok(())
}
