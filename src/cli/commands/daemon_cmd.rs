//! `secret-keeper daemon` — start, run, stop, and inspect the daemon.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing_subscriber::EnvFilter;

use crate::cli::{output, resolve_master_key, socket_for_cli, vault_path, Cli};
use crate::config::Settings;
use crate::daemon::{self, socket, Daemon, DaemonClient};
use crate::errors::{Result, SecretKeeperError};
use crate::vault::VaultStore;

/// `daemon start` — spawn a detached daemon process.
pub fn start(cli: &Cli) -> Result<()> {
    let sock = socket_for_cli(cli)?;
    let client = DaemonClient::at(sock.clone());
    if client.is_running() {
        output::info("Daemon is already running.");
        return Ok(());
    }

    socket::ensure_socket_dir()?;
    let log_path = socket::daemon_log_path();
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let log_err = log.try_clone()?;

    let exe = std::env::current_exe()?;
    let mut command = Command::new(exe);
    command
        .arg("daemon")
        .arg("run")
        .stdin(Stdio::null())
        .stdout(log)
        .stderr(log_err);
    if let Some(project) = &cli.project {
        command.arg("--project").arg(project);
    }
    if cli.local {
        command.arg("--local");
    }

    let child = command.spawn()?;
    output::success(&format!(
        "Daemon starting (pid {}) on {}",
        child.id(),
        sock.display()
    ));
    output::tip(&format!("Logs: {}", log_path.display()));

    Ok(())
}

/// `daemon run` — run the daemon in the foreground.
pub fn run_foreground(cli: &Cli) -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let db_path = vault_path(cli)?;
    let sock = socket_for_cli(cli)?;

    let mut store = VaultStore::open(&db_path)?;
    // Prompting is fine when run interactively; a detached start relies
    // on the env var, keyring, or keyfile.
    let key = resolve_master_key(&db_path, true)?;
    store.load_key(key.as_bytes())?;

    let base_dir = db_path
        .parent()
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .unwrap_or(std::env::current_dir()?);
    let settings = Settings::load(&base_dir)?;

    let daemon = Daemon::new(store, sock, &settings)?;

    // One cooperative event loop; children run as separate processes.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(daemon::server::run(daemon))
}

/// `daemon stop` — ask a running daemon to shut down.
pub fn stop(cli: &Cli) -> Result<()> {
    let client = DaemonClient::at(socket_for_cli(cli)?);
    client.shutdown()?;
    output::success("Daemon stopped.");
    Ok(())
}

/// `daemon status` — ping the daemon.
pub fn status(cli: &Cli) -> Result<()> {
    let client = DaemonClient::at(socket_for_cli(cli)?);
    match client.ping() {
        Ok(count) => {
            output::success(&format!(
                "Daemon running on {} ({count} secrets loaded)",
                client.socket_path().display()
            ));
        }
        Err(SecretKeeperError::DaemonNotRunning) => {
            output::info("Daemon is not running.");
        }
        Err(err) => return Err(err),
    }
    Ok(())
}
