//! Daemon mediator — owns the decrypted secret set and the vault handle,
//! serves the IPC socket, and applies the policy filter and output
//! scrubber around every executed command.
//!
//! This module provides:
//! - `Daemon`, the long-lived server object (`mod.rs`)
//! - Socket topology and project fingerprints (`socket`)
//! - Wire types (`protocol`)
//! - The accept loop and request handlers (`server`)
//! - The caller-side client (`client`)

pub mod client;
pub mod protocol;
pub mod server;
pub mod socket;

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};
use zeroize::Zeroize;

use crate::config::Settings;
use crate::errors::Result;
use crate::rotation::{RotationManager, RotationOutcome, RotationScheduler, SchedulerState, TickCallback};
use crate::scrub::Scrubber;
use crate::vault::VaultStore;

pub use client::DaemonClient;
pub use protocol::{ExecResult, Request, Response};

/// One immutable epoch of the secret state: the decrypted map and the
/// scrubber built from it.  The pair is always swapped as a unit so no
/// scrub can observe patterns from two epochs.
pub struct SecretEpoch {
    pub secrets: HashMap<String, String>,
    pub scrubber: Scrubber,
}

impl SecretEpoch {
    fn from_map(secrets: HashMap<String, String>) -> Self {
        let scrubber = Scrubber::new(&secrets);
        Self { secrets, scrubber }
    }

    fn empty() -> Self {
        Self {
            secrets: HashMap::new(),
            scrubber: Scrubber::empty(),
        }
    }
}

impl Drop for SecretEpoch {
    fn drop(&mut self) {
        for value in self.secrets.values_mut() {
            value.zeroize();
        }
    }
}

type SharedEpoch = Arc<RwLock<Arc<SecretEpoch>>>;

/// The long-lived daemon.
pub struct Daemon {
    vault: Arc<Mutex<VaultStore>>,
    epoch: SharedEpoch,
    socket_path: PathBuf,
    scheduler: RotationScheduler,
    manager: Arc<RotationManager>,
    shutdown_tx: watch::Sender<bool>,
    running: AtomicBool,
    default_exec_timeout: Duration,
}

impl Daemon {
    /// Build a daemon around an unlocked vault, serving `socket_path`.
    ///
    /// Everything is explicit — no process-wide registry — so tests can
    /// stand up a daemon at an arbitrary path.
    pub fn new(vault: VaultStore, socket_path: PathBuf, settings: &Settings) -> Result<Arc<Self>> {
        let secrets = vault.get_all_secrets()?;
        let epoch: SharedEpoch = Arc::new(RwLock::new(Arc::new(SecretEpoch::from_map(secrets))));

        let vault = Arc::new(Mutex::new(vault));
        let manager = Arc::new(RotationManager::new(Arc::clone(&vault)));

        let rotation_log = socket_path
            .parent()
            .map_or_else(socket::rotation_log_path, |dir| dir.join(socket::ROTATION_LOG));
        let callback: TickCallback = {
            let vault = Arc::clone(&vault);
            let epoch = Arc::clone(&epoch);
            Arc::new(move |outcomes: &[RotationOutcome]| {
                append_rotation_log(&rotation_log, outcomes);
                if outcomes.iter().any(|o| o.success) {
                    match reload_epoch(&vault, &epoch) {
                        Ok(count) => info!(secrets = count, "secret map reloaded after rotation"),
                        Err(err) => error!(error = %err, "failed to reload secrets after rotation"),
                    }
                }
            })
        };

        let scheduler = RotationScheduler::new(
            Arc::clone(&manager),
            Duration::from_secs(settings.rotation_tick_secs),
            Some(callback),
        );

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Arc::new(Self {
            vault,
            epoch,
            socket_path,
            scheduler,
            manager,
            shutdown_tx,
            running: AtomicBool::new(false),
            default_exec_timeout: Duration::from_secs(settings.exec_timeout_secs),
        }))
    }

    /// Current secret epoch.  The returned `Arc` stays coherent even if
    /// a rotation swaps in a new epoch mid-scrub.
    pub fn current_epoch(&self) -> Arc<SecretEpoch> {
        Arc::clone(&self.epoch.read().unwrap_or_else(|p| p.into_inner()))
    }

    /// Re-read every secret from the vault and swap in a fresh epoch.
    pub fn reload_secrets(&self) -> Result<usize> {
        reload_epoch(&self.vault, &self.epoch)
    }

    /// Whether the server loop is currently accepting connections.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn rotation_manager(&self) -> Arc<RotationManager> {
        Arc::clone(&self.manager)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub(crate) fn default_exec_timeout(&self) -> Duration {
        self.default_exec_timeout
    }

    /// Ask the running server loop to shut down gracefully.
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub(crate) fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub(crate) fn mark_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn start_scheduler(&self) {
        self.scheduler.start();
    }

    /// Graceful teardown: stop the scheduler, unlink the socket, wipe
    /// the in-memory secrets, lock the vault.
    pub(crate) async fn teardown(&self) {
        self.scheduler.stop().await;

        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }

        {
            let mut slot = self.epoch.write().unwrap_or_else(|p| p.into_inner());
            *slot = Arc::new(SecretEpoch::empty());
        }

        let mut vault = self.vault.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(err) = vault.lock() {
            error!(error = %err, "failed to lock vault during shutdown");
        }

        self.mark_running(false);
        info!("daemon stopped");
    }
}

fn reload_epoch(vault: &Mutex<VaultStore>, epoch: &RwLock<Arc<SecretEpoch>>) -> Result<usize> {
    let secrets = {
        let vault = vault.lock().unwrap_or_else(|p| p.into_inner());
        vault.get_all_secrets()?
    };
    let count = secrets.len();
    let fresh = Arc::new(SecretEpoch::from_map(secrets));

    let mut slot = epoch.write().unwrap_or_else(|p| p.into_inner());
    *slot = fresh;
    Ok(count)
}

/// Append one line per rotation outcome to the rotation log.
fn append_rotation_log(path: &Path, outcomes: &[RotationOutcome]) {
    let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    for outcome in outcomes {
        let line = match &outcome.error {
            None => format!(
                "{} rotated {} via {}\n",
                Utc::now().to_rfc3339(),
                outcome.secret_name,
                outcome.provider
            ),
            Some(err) => format!(
                "{} FAILED {} via {}: {}\n",
                Utc::now().to_rfc3339(),
                outcome.secret_name,
                outcome.provider,
                err
            ),
        };
        let _ = file.write_all(line.as_bytes());
    }
}
