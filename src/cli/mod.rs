//! CLI module — Clap argument parser, output helpers, and command
//! implementations.  Every command is a thin consumer of the core
//! modules; the contracts live in `vault`, `daemon`, and `rotation`.

pub mod commands;
pub mod gitignore;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::crypto::keyfile;
use crate::errors::{Result, SecretKeeperError};
use crate::vault::paths;

/// Environment variable carrying the master key for non-interactive flows.
pub const PASSWORD_ENV: &str = "SECRET_KEEPER_PASSWORD";

/// secret-keeper CLI: a local secret manager whose daemon runs commands
/// with credentials the caller never observes.
#[derive(Parser)]
#[command(name = "secret-keeper", about = "Local secret manager with a mediating daemon", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Operate on the vault under this project directory
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Force a project-local vault under the current directory
    #[arg(long, global = true)]
    pub local: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Initialize a new vault
    Init {
        /// Generate a random master key into a keyfile instead of prompting
        #[arg(long)]
        generate_key: bool,
    },

    /// Set a secret (add or update)
    Set {
        /// Secret name (e.g. DATABASE_URL)
        name: String,
        /// Secret value (omit for interactive prompt)
        value: Option<String>,
        /// Human-readable description
        #[arg(long)]
        description: Option<String>,
        /// Tags (repeatable)
        #[arg(long)]
        tag: Vec<String>,
        /// Store as a visible credential instead of a masked secret
        #[arg(long)]
        credential: bool,
    },

    /// Get a secret's value
    Get {
        /// Secret name
        name: String,
    },

    /// List all secrets (names and metadata only)
    List,

    /// Delete a secret
    Delete {
        /// Secret name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Securely erase the vault (a reset is destroy + init)
    Destroy {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Import secrets from a .env file
    Import {
        /// Path to the file to import
        file: String,
        /// Skip config-looking names (URLs, hosts, ports, ...)
        #[arg(long)]
        secrets_only: bool,
    },

    /// Export secrets as .env lines
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// View the audit log
    Audit {
        /// Number of entries to show
        #[arg(long, default_value = "50")]
        last: usize,
    },

    /// Change the vault master key (re-encrypts every secret)
    ChangeKey,

    /// Run a command through the daemon with secrets injected
    Exec {
        /// Command line (after --)
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
        /// Working directory for the command
        #[arg(long)]
        cwd: Option<String>,
        /// Timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Manage the daemon
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },

    /// Manage secret rotation
    Rotation {
        #[command(subcommand)]
        action: RotationAction,
    },

    /// Manage authentication material
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(clap::Subcommand)]
pub enum DaemonAction {
    /// Start the daemon in the background
    Start,
    /// Run the daemon in the foreground
    Run,
    /// Stop a running daemon
    Stop,
    /// Show daemon status
    Status,
}

#[derive(clap::Subcommand)]
pub enum RotationAction {
    /// Configure rotation for a secret
    Configure {
        /// Secret name
        name: String,
        /// Provider tag (custom, aws, openai, github)
        #[arg(long)]
        provider: String,
        /// Rotation interval in whole days
        #[arg(long)]
        days: i64,
        /// Provider-specific configuration as JSON
        #[arg(long, default_value = "{}")]
        config: String,
    },
    /// Enable a configured rotation
    Enable { name: String },
    /// Disable a configured rotation
    Disable { name: String },
    /// Remove a rotation config
    Delete { name: String },
    /// List rotation configs
    List,
    /// Rotate a secret immediately
    Now { name: String },
    /// Dry-run a rotation without changing anything
    Test { name: String },
    /// Show rotation history
    History {
        /// Restrict to one secret
        name: Option<String>,
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        last: usize,
    },
}

#[derive(clap::Subcommand)]
pub enum AuthAction {
    /// Generate a keyfile with a fresh random master key
    KeyfileGenerate,

    /// Save the vault master key to the OS keyring (auto-unlock)
    #[cfg(feature = "keyring-store")]
    Keyring {
        /// Remove the key from the keyring instead of saving
        #[arg(long)]
        delete: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the vault database path from the CLI arguments.
pub fn vault_path(cli: &Cli) -> Result<PathBuf> {
    paths::resolve_vault_path(cli.project.as_deref(), cli.local)
}

/// Resolve the daemon socket this invocation should address: the global
/// socket for the global vault, the project socket otherwise.
pub fn socket_for_cli(cli: &Cli) -> Result<PathBuf> {
    let db_path = vault_path(cli)?;
    let global_db = paths::vault_db_path(&paths::home_dir()?);

    if db_path == global_db {
        Ok(crate::daemon::socket::global_socket_path())
    } else {
        // db = <base>/.secret-keeper/secrets.db — fingerprint the base.
        // The fingerprint is over the absolute path, so stable across
        // invocations from different relative spellings.
        let base = db_path
            .parent()
            .and_then(|p| p.parent())
            .ok_or_else(|| SecretKeeperError::ConfigError("vault path has no base".into()))?;
        let base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
        Ok(crate::daemon::socket::project_socket_path(&base))
    }
}

/// Get the master key for a vault, trying in order:
/// 1. `SECRET_KEEPER_PASSWORD` env var (CI/CD, daemon)
/// 2. OS keyring (if compiled with `keyring-store`)
/// 3. Keyfile next to the vault
/// 4. Interactive prompt
///
/// Returns `Zeroizing<String>` so the key is wiped from memory on drop.
pub fn resolve_master_key(db_path: &Path, allow_prompt: bool) -> Result<Zeroizing<String>> {
    // 1. Environment variable first.
    if let Ok(key) = std::env::var(PASSWORD_ENV) {
        if !key.is_empty() {
            return Ok(Zeroizing::new(key));
        }
    }

    // 2. OS keyring.
    #[cfg(feature = "keyring-store")]
    {
        let vault_id = db_path.to_string_lossy();
        if let Ok(Some(key)) = crate::keyring::get_key(&vault_id) {
            return Ok(Zeroizing::new(key));
        }
    }

    // 3. Keyfile next to the vault.
    let keyfile = paths::keyfile_path(db_path);
    if keyfile.exists() {
        return keyfile::load_keyfile(&keyfile);
    }

    // 4. Interactive prompt.
    if !allow_prompt {
        return Err(SecretKeeperError::VaultLocked);
    }
    let key = dialoguer::Password::new()
        .with_prompt("Enter vault master key")
        .interact()
        .map_err(|e| SecretKeeperError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(key))
}

/// Prompt for a new master key with confirmation (used during `init`
/// and `change-key`).  Also respects `SECRET_KEEPER_PASSWORD`.
pub fn prompt_new_master_key() -> Result<Zeroizing<String>> {
    const MIN_LEN: usize = 8;

    if let Ok(key) = std::env::var(PASSWORD_ENV) {
        if !key.is_empty() {
            if key.len() < MIN_LEN {
                return Err(SecretKeeperError::CommandFailed(format!(
                    "master key must be at least {MIN_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(key));
        }
    }

    loop {
        let key = dialoguer::Password::new()
            .with_prompt("Choose vault master key")
            .with_confirmation("Confirm vault master key", "Keys do not match, try again")
            .interact()
            .map_err(|e| SecretKeeperError::CommandFailed(format!("password prompt: {e}")))?;

        if key.len() < MIN_LEN {
            output::warning(&format!(
                "Master key must be at least {MIN_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(key));
    }
}

/// Open the vault from the CLI args and unlock it.
pub fn open_unlocked(cli: &Cli) -> Result<crate::vault::VaultStore> {
    let path = vault_path(cli)?;
    let mut store = crate::vault::VaultStore::open(&path)?;
    let key = resolve_master_key(&path, true)?;
    store.load_key(key.as_bytes())?;
    Ok(store)
}
