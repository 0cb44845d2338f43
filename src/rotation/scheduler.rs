//! Cooperative rotation scheduler.
//!
//! A periodic tokio task that asks the manager for due rotations on
//! every tick and runs them one at a time.  Stop cancels the next tick
//! but waits for an in-flight rotation to finish.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::manager::{RotationManager, RotationOutcome};

/// Default tick interval: one hour.
pub const DEFAULT_TICK: Duration = Duration::from_secs(3600);

/// Observable scheduler states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    Rotating,
}

const STATE_STOPPED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_ROTATING: u8 = 2;

/// Callback invoked with the outcomes of each tick that rotated something.
pub type TickCallback = Arc<dyn Fn(&[RotationOutcome]) + Send + Sync>;

pub struct RotationScheduler {
    manager: Arc<RotationManager>,
    tick: Duration,
    state: Arc<AtomicU8>,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    callback: Option<TickCallback>,
}

impl RotationScheduler {
    pub fn new(manager: Arc<RotationManager>, tick: Duration, callback: Option<TickCallback>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            manager,
            tick,
            state: Arc::new(AtomicU8::new(STATE_STOPPED)),
            shutdown_tx,
            handle: Mutex::new(None),
            callback,
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.state.load(Ordering::SeqCst) {
            STATE_RUNNING => SchedulerState::Running,
            STATE_ROTATING => SchedulerState::Rotating,
            _ => SchedulerState::Stopped,
        }
    }

    /// Start the periodic task.  Idempotent: a second start is a no-op.
    pub fn start(&self) {
        let mut slot = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_some() {
            debug!("scheduler already running");
            return;
        }

        let manager = Arc::clone(&self.manager);
        let state = Arc::clone(&self.state);
        let callback = self.callback.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let tick = self.tick;

        state.store(STATE_RUNNING, Ordering::SeqCst);
        info!(interval_secs = tick.as_secs(), "rotation scheduler started");

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(tick);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first interval tick fires immediately; skip it so a
            // freshly started daemon does not rotate on boot.
            timer.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("rotation scheduler stopping");
                            break;
                        }
                    }

                    _ = timer.tick() => {
                        state.store(STATE_ROTATING, Ordering::SeqCst);

                        // Rotation and the reload callback both hit the vault
                        // (KDF-heavy); keep them off the event loop.
                        let worker = Arc::clone(&manager);
                        let cb = callback.clone();
                        let outcomes = tokio::task::spawn_blocking(move || {
                            let outcomes = worker.run_due();
                            if !outcomes.is_empty() {
                                if let Some(cb) = &cb {
                                    cb(&outcomes);
                                }
                            }
                            outcomes
                        })
                        .await
                        .unwrap_or_default();

                        for outcome in &outcomes {
                            if let Some(error) = &outcome.error {
                                warn!(secret = %outcome.secret_name, error = %error, "scheduled rotation failed");
                            }
                        }

                        state.store(STATE_RUNNING, Ordering::SeqCst);
                    }
                }
            }

            state.store(STATE_STOPPED, Ordering::SeqCst);
        });

        *slot = Some(handle);
    }

    /// Stop the scheduler.  Cancels any future tick and waits for an
    /// in-flight rotation to complete before returning.
    pub async fn stop(&self) {
        let handle = {
            let mut slot = self.handle.lock().unwrap_or_else(|p| p.into_inner());
            slot.take()
        };

        let Some(handle) = handle else {
            return;
        };

        self.shutdown_tx.send_replace(true);
        if let Err(err) = handle.await {
            warn!(error = %err, "scheduler task panicked");
        }

        // Re-arm so a later start sees a fresh shutdown signal.
        self.shutdown_tx.send_replace(false);
        self.state.store(STATE_STOPPED, Ordering::SeqCst);
    }
}
