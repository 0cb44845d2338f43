//! Rotation config and history tables.
//!
//! One config row per secret; history rows are append-only.  The
//! `RotationManager` drives these through the vault handle so every
//! write shares the vault's durability settings.

use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension;
use serde_json::Value;

use crate::crypto::encryption::encrypt;
use crate::errors::{Result, SecretKeeperError};

use super::store::{parse_ts, VaultStore};

/// Per-secret rotation configuration.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    pub secret_name: String,
    pub provider: String,
    pub schedule_days: i64,
    pub last_rotated: Option<DateTime<Utc>>,
    pub next_rotation: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub provider_config: Value,
}

/// Outcome status of one rotation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStatus {
    Success,
    Failed,
}

impl RotationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// One append-only rotation history row.
#[derive(Debug, Clone)]
pub struct RotationHistoryEntry {
    pub id: i64,
    pub secret_name: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub provider: String,
    pub error: Option<String>,
}

impl VaultStore {
    /// Insert or replace the rotation config for a secret.
    pub fn upsert_rotation_config(&mut self, config: &RotationConfig) -> Result<()> {
        if config.schedule_days < 1 {
            return Err(SecretKeeperError::RotationError(
                "schedule must be at least one day".into(),
            ));
        }

        let config_json = serde_json::to_string(&config.provider_config)
            .map_err(|e| SecretKeeperError::SerializationError(e.to_string()))?;

        self.conn().execute(
            "INSERT INTO rotation_config
                 (secret_name, provider, schedule_days, last_rotated, next_rotation, enabled, provider_config)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(secret_name) DO UPDATE SET
                 provider = excluded.provider,
                 schedule_days = excluded.schedule_days,
                 last_rotated = excluded.last_rotated,
                 next_rotation = excluded.next_rotation,
                 enabled = excluded.enabled,
                 provider_config = excluded.provider_config",
            rusqlite::params![
                config.secret_name,
                config.provider,
                config.schedule_days,
                config.last_rotated.map(|t| t.to_rfc3339()),
                config.next_rotation.map(|t| t.to_rfc3339()),
                config.enabled as i64,
                config_json,
            ],
        )?;
        Ok(())
    }

    /// Fetch the rotation config for one secret.
    pub fn get_rotation_config(&self, secret_name: &str) -> Result<Option<RotationConfig>> {
        self.conn()
            .query_row(
                "SELECT secret_name, provider, schedule_days, last_rotated, next_rotation,
                        enabled, provider_config
                 FROM rotation_config WHERE secret_name = ?1",
                [secret_name],
                row_to_config,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All rotation configs, sorted by secret name.
    pub fn list_rotation_configs(&self) -> Result<Vec<RotationConfig>> {
        let mut stmt = self.conn().prepare(
            "SELECT secret_name, provider, schedule_days, last_rotated, next_rotation,
                    enabled, provider_config
             FROM rotation_config ORDER BY secret_name",
        )?;
        let rows = stmt.query_map([], row_to_config)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Remove a rotation config.  Returns whether one existed.
    pub fn delete_rotation_config(&mut self, secret_name: &str) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM rotation_config WHERE secret_name = ?1",
            [secret_name],
        )?;
        Ok(removed > 0)
    }

    /// Flip the enabled flag for a rotation config.
    pub fn set_rotation_enabled(&mut self, secret_name: &str, enabled: bool) -> Result<()> {
        let changed = self.conn().execute(
            "UPDATE rotation_config SET enabled = ?1 WHERE secret_name = ?2",
            rusqlite::params![enabled as i64, secret_name],
        )?;
        if changed == 0 {
            return Err(SecretKeeperError::RotationError(format!(
                "no rotation configured for '{secret_name}'"
            )));
        }
        Ok(())
    }

    /// Configs due now: enabled and (never rotated or past due), ordered
    /// by ascending next-rotation time.
    pub fn due_rotations(&self, now: DateTime<Utc>) -> Result<Vec<RotationConfig>> {
        let mut stmt = self.conn().prepare(
            "SELECT secret_name, provider, schedule_days, last_rotated, next_rotation,
                    enabled, provider_config
             FROM rotation_config
             WHERE enabled = 1 AND (next_rotation IS NULL OR next_rotation <= ?1)
             ORDER BY next_rotation ASC",
        )?;
        let rows = stmt.query_map([now.to_rfc3339()], row_to_config)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Commit a successful rotation: new secret value, advanced
    /// schedule, and a success history row, all in one transaction.
    pub fn record_rotation_success(
        &mut self,
        secret_name: &str,
        new_value: &str,
        provider: &str,
        schedule_days: i64,
    ) -> Result<()> {
        let new_blob = encrypt(new_value.as_bytes(), self.master()?.as_bytes())?;
        let now = Utc::now();
        let next = now + Duration::days(schedule_days);

        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "UPDATE secrets SET value = ?1, updated_at = ?2 WHERE name = ?3",
            rusqlite::params![new_blob, now.to_rfc3339(), secret_name],
        )?;
        tx.execute(
            "UPDATE rotation_config SET last_rotated = ?1, next_rotation = ?2
             WHERE secret_name = ?3",
            rusqlite::params![now.to_rfc3339(), next.to_rfc3339(), secret_name],
        )?;
        tx.execute(
            "INSERT INTO rotation_history (secret_name, timestamp, status, provider, error)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            rusqlite::params![
                secret_name,
                now.to_rfc3339(),
                RotationStatus::Success.as_str(),
                provider
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Record a failed rotation attempt.  The stored secret is untouched.
    pub fn record_rotation_failure(
        &mut self,
        secret_name: &str,
        provider: &str,
        error: &str,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO rotation_history (secret_name, timestamp, status, provider, error)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                secret_name,
                Utc::now().to_rfc3339(),
                RotationStatus::Failed.as_str(),
                provider,
                error
            ],
        )?;
        Ok(())
    }

    /// Rotation history, most recent first, optionally for one secret.
    pub fn rotation_history(
        &self,
        secret_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RotationHistoryEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<RotationHistoryEntry> {
            let ts: String = row.get(2)?;
            Ok(RotationHistoryEntry {
                id: row.get(0)?,
                secret_name: row.get(1)?,
                timestamp: parse_ts(&ts),
                status: row.get(3)?,
                provider: row.get(4)?,
                error: row.get(5)?,
            })
        };

        let entries = match secret_name {
            Some(name) => {
                let mut stmt = self.conn().prepare(
                    "SELECT id, secret_name, timestamp, status, provider, error
                     FROM rotation_history WHERE secret_name = ?1
                     ORDER BY id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(rusqlite::params![name, limit], map_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self.conn().prepare(
                    "SELECT id, secret_name, timestamp, status, provider, error
                     FROM rotation_history
                     ORDER BY id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map([limit], map_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(entries)
    }
}

fn row_to_config(row: &rusqlite::Row<'_>) -> rusqlite::Result<RotationConfig> {
    let last: Option<String> = row.get(3)?;
    let next: Option<String> = row.get(4)?;
    let config_json: String = row.get(6)?;

    Ok(RotationConfig {
        secret_name: row.get(0)?,
        provider: row.get(1)?,
        schedule_days: row.get(2)?,
        last_rotated: last.as_deref().map(parse_ts),
        next_rotation: next.as_deref().map(parse_ts),
        enabled: row.get::<_, i64>(5)? != 0,
        provider_config: serde_json::from_str(&config_json).unwrap_or(Value::Null),
    })
}
