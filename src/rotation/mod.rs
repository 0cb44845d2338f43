//! Rotation engine — providers, orchestration, and scheduling.
//!
//! This module provides:
//! - The `RotationProvider` trait and tag-indexed registry (`provider`)
//! - The four built-in providers (`custom`, `openai`, `aws`, `github`)
//! - `RotationManager`, the vault-facing orchestrator (`manager`)
//! - `RotationScheduler`, the periodic tick task (`scheduler`)

pub mod aws;
pub mod custom;
pub mod github;
pub mod manager;
pub mod openai;
pub mod provider;
pub mod scheduler;

pub use manager::{RotationManager, RotationOutcome};
pub use provider::{ProviderRegistry, RotationProvider};
pub use scheduler::{RotationScheduler, SchedulerState, TickCallback, DEFAULT_TICK};
