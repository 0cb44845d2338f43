//! `secret-keeper rotation` — configure and drive secret rotation.

use std::sync::{Arc, Mutex};

use crate::cli::{open_unlocked, output, Cli};
use crate::errors::{Result, SecretKeeperError};
use crate::rotation::RotationManager;

fn manager(cli: &Cli) -> Result<RotationManager> {
    let store = open_unlocked(cli)?;
    Ok(RotationManager::new(Arc::new(Mutex::new(store))))
}

pub fn configure(cli: &Cli, name: &str, provider: &str, days: i64, config_json: &str) -> Result<()> {
    let config: serde_json::Value = serde_json::from_str(config_json)
        .map_err(|e| SecretKeeperError::CommandFailed(format!("invalid provider config JSON: {e}")))?;

    manager(cli)?.configure(name, provider, days, config)?;
    output::success(&format!(
        "Rotation configured: '{name}' via {provider} every {days} day(s)"
    ));
    Ok(())
}

pub fn enable(cli: &Cli, name: &str) -> Result<()> {
    manager(cli)?.enable(name)?;
    output::success(&format!("Rotation enabled for '{name}'"));
    Ok(())
}

pub fn disable(cli: &Cli, name: &str) -> Result<()> {
    manager(cli)?.disable(name)?;
    output::success(&format!("Rotation disabled for '{name}'"));
    Ok(())
}

pub fn delete(cli: &Cli, name: &str) -> Result<()> {
    if manager(cli)?.delete(name)? {
        output::success(&format!("Rotation config removed for '{name}'"));
    } else {
        output::info(&format!("No rotation configured for '{name}'"));
    }
    Ok(())
}

pub fn list(cli: &Cli) -> Result<()> {
    let configs = manager(cli)?.list()?;
    output::print_rotation_table(&configs);
    Ok(())
}

pub fn now(cli: &Cli, name: &str) -> Result<()> {
    manager(cli)?.rotate_now(name)?;
    output::success(&format!("Secret '{name}' rotated"));
    output::tip("A running daemon reloads rotated secrets on its next scheduler tick.");
    Ok(())
}

pub fn test(cli: &Cli, name: &str) -> Result<()> {
    if manager(cli)?.test(name)? {
        output::success(&format!("Dry-run rotation for '{name}' looks good"));
    } else {
        output::warning(&format!("Dry-run rotation for '{name}' failed"));
    }
    Ok(())
}

pub fn history(cli: &Cli, name: Option<&str>, last: usize) -> Result<()> {
    let store = open_unlocked(cli)?;
    let entries = store.rotation_history(name, last)?;

    if entries.is_empty() {
        output::info("No rotation history.");
        return Ok(());
    }

    for entry in &entries {
        let detail = entry.error.as_deref().unwrap_or("");
        println!(
            "{}  {:<24} {:<8} {:<8} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.secret_name,
            entry.provider,
            entry.status,
            detail
        );
    }
    Ok(())
}
