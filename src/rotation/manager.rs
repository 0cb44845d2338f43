//! Rotation orchestration.
//!
//! The manager sits between the vault and the providers: it owns the
//! provider registry, validates configs, runs rotations, and records
//! every attempt in the history table.  Provider calls run with the
//! vault lock released — external CLIs can be slow.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{Result, SecretKeeperError};
use crate::vault::{RotationConfig, VaultStore};

/// Result of one rotation attempt, as delivered to the scheduler callback.
#[derive(Debug, Clone)]
pub struct RotationOutcome {
    pub secret_name: String,
    pub provider: String,
    pub success: bool,
    pub error: Option<String>,
}

pub struct RotationManager {
    vault: Arc<Mutex<VaultStore>>,
    registry: super::provider::ProviderRegistry,
}

impl RotationManager {
    pub fn new(vault: Arc<Mutex<VaultStore>>) -> Self {
        Self {
            vault,
            registry: super::provider::ProviderRegistry::with_builtins(),
        }
    }

    /// Registered (tag, display name) pairs.
    pub fn providers(&self) -> Vec<(&'static str, &'static str)> {
        self.registry.list()
    }

    /// Create or replace the rotation config for a secret.
    ///
    /// Fails fast on an unknown provider tag or an unusable config.
    pub fn configure(
        &self,
        secret_name: &str,
        provider_tag: &str,
        schedule_days: i64,
        provider_config: Value,
    ) -> Result<()> {
        let provider = self.registry.get(provider_tag)?;
        if !provider.validate_config(&provider_config) {
            return Err(SecretKeeperError::RotationError(format!(
                "invalid configuration for provider '{provider_tag}'"
            )));
        }
        if schedule_days < 1 {
            return Err(SecretKeeperError::RotationError(
                "schedule must be at least one day".into(),
            ));
        }

        let mut vault = self.lock_vault();
        // The secret must exist before rotation can be scheduled for it.
        vault.get_secret(secret_name)?;

        vault.upsert_rotation_config(&RotationConfig {
            secret_name: secret_name.to_string(),
            provider: provider_tag.to_string(),
            schedule_days,
            last_rotated: None,
            next_rotation: Some(Utc::now() + Duration::days(schedule_days)),
            enabled: true,
            provider_config,
        })
    }

    pub fn enable(&self, secret_name: &str) -> Result<()> {
        self.lock_vault().set_rotation_enabled(secret_name, true)
    }

    pub fn disable(&self, secret_name: &str) -> Result<()> {
        self.lock_vault().set_rotation_enabled(secret_name, false)
    }

    pub fn delete(&self, secret_name: &str) -> Result<bool> {
        self.lock_vault().delete_rotation_config(secret_name)
    }

    pub fn get(&self, secret_name: &str) -> Result<Option<RotationConfig>> {
        self.lock_vault().get_rotation_config(secret_name)
    }

    pub fn list(&self) -> Result<Vec<RotationConfig>> {
        self.lock_vault().list_rotation_configs()
    }

    /// Rotate one secret now.
    ///
    /// Provider errors are recorded as failed history rows and returned;
    /// the stored value stays intact in that case.
    pub fn rotate_now(&self, secret_name: &str) -> Result<()> {
        let (config, current_value) = {
            let vault = self.lock_vault();
            let config = vault.get_rotation_config(secret_name)?.ok_or_else(|| {
                SecretKeeperError::RotationError(format!(
                    "no rotation configured for '{secret_name}'"
                ))
            })?;
            let current = vault.get_secret(secret_name)?;
            (config, current)
        };

        let provider = self.registry.get(&config.provider)?;
        info!(secret = secret_name, provider = %config.provider, "rotating secret");

        match provider.rotate(&config.provider_config, &current_value) {
            Ok(new_value) => {
                let mut vault = self.lock_vault();
                vault.record_rotation_success(
                    secret_name,
                    &new_value,
                    &config.provider,
                    config.schedule_days,
                )?;
                info!(secret = secret_name, "rotation succeeded");
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!(secret = secret_name, error = %message, "rotation failed");
                self.lock_vault()
                    .record_rotation_failure(secret_name, &config.provider, &message)?;
                Err(SecretKeeperError::RotationError(message))
            }
        }
    }

    /// Dry-run a rotation without mutating anything.
    pub fn test(&self, secret_name: &str) -> Result<bool> {
        let (config, current_value) = {
            let vault = self.lock_vault();
            let config = vault.get_rotation_config(secret_name)?.ok_or_else(|| {
                SecretKeeperError::RotationError(format!(
                    "no rotation configured for '{secret_name}'"
                ))
            })?;
            let current = vault.get_secret(secret_name)?;
            (config, current)
        };

        let provider = self.registry.get(&config.provider)?;
        provider.test_rotate(&config.provider_config, &current_value)
    }

    /// Configs due for rotation right now.
    pub fn due_now(&self) -> Result<Vec<RotationConfig>> {
        self.lock_vault().due_rotations(Utc::now())
    }

    /// Run every due rotation sequentially.
    ///
    /// Never in parallel: provider flows like the AWS key dance are not
    /// idempotent.  One failure does not stop the rest.
    pub fn run_due(&self) -> Vec<RotationOutcome> {
        let due = match self.due_now() {
            Ok(due) => due,
            Err(err) => {
                warn!(error = %err, "failed to query due rotations");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::with_capacity(due.len());
        for config in due {
            let outcome = match self.rotate_now(&config.secret_name) {
                Ok(()) => RotationOutcome {
                    secret_name: config.secret_name,
                    provider: config.provider,
                    success: true,
                    error: None,
                },
                Err(err) => RotationOutcome {
                    secret_name: config.secret_name,
                    provider: config.provider,
                    success: false,
                    error: Some(err.to_string()),
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    fn lock_vault(&self) -> std::sync::MutexGuard<'_, VaultStore> {
        self.vault.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
