//! Vault module — encrypted secret storage on SQLite.
//!
//! This module provides:
//! - `VaultStore`, the main handle (`store`)
//! - Schema bootstrap and lazy upgrades (`schema`)
//! - Secret metadata and sensitivity types (`secret`)
//! - Local/global path resolution (`paths`)
//! - `.env` import parsing and classification (`import`)
//! - The append-only audit log (`audit`)
//! - Rotation config/history tables (`rotation`)

pub mod audit;
pub mod import;
pub mod paths;
pub mod rotation;
pub mod schema;
pub mod secret;
pub mod store;

// Re-export the most commonly used items.
pub use audit::{AuditAction, AuditEntry};
pub use import::ImportSummary;
pub use paths::{keyfile_path, resolve_vault_path, vault_db_path};
pub use rotation::{RotationConfig, RotationHistoryEntry, RotationStatus};
pub use secret::{SecretMetadata, SecretOptions, Sensitivity};
pub use store::VaultStore;
