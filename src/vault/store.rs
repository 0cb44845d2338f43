//! High-level vault operations.
//!
//! `VaultStore` wraps the SQLite schema and the crypto layer so the rest
//! of the application can work with simple method calls like
//! `store.add_secret("DB_URL", "postgres://...", opts)`.
//!
//! A store is opened *locked*; `load_key` arms it with master key
//! material.  There is no stored password verifier — a wrong key is
//! detected by the first failed auth-tag check.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use zeroize::Zeroize;

use crate::crypto::encryption::{decrypt, encrypt};
use crate::crypto::keys::MasterKey;
use crate::errors::{Result, SecretKeeperError};

use super::audit::{self, AuditAction, AuditEntry};
use super::import::{parse_env_content, should_skip, ImportSummary};
use super::paths::ensure_vault_dir;
use super::schema;
use super::secret::{validate_secret_name, SecretMetadata, SecretOptions, Sensitivity};

/// The main vault handle.
pub struct VaultStore {
    conn: Connection,
    path: PathBuf,
    master: Option<MasterKey>,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Whether a vault database exists at `path`.
    pub fn is_initialized(path: &Path) -> bool {
        path.exists()
    }

    /// Create a brand-new vault at `path` and unlock it with `key`.
    ///
    /// The vault directory is created with mode 0700.  A vault is created
    /// once per path; a reset is a destroy-then-create sequence.
    pub fn initialize(path: &Path, key: &[u8]) -> Result<Self> {
        if path.exists() {
            return Err(SecretKeeperError::VaultAlreadyExists(path.to_path_buf()));
        }

        ensure_vault_dir(path)?;

        let conn = Connection::open(path)?;
        schema::apply_pragmas(&conn)?;
        schema::migrate(&conn)?;

        conn.execute(
            "INSERT INTO vault_meta (key, value) VALUES ('created_at', ?1)",
            [Utc::now().to_rfc3339()],
        )?;
        audit::append(&conn, AuditAction::VaultInitialized, None, None)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            master: Some(MasterKey::new(key.to_vec())),
        })
    }

    /// Open an existing vault in the locked state.
    ///
    /// Runs the lazy schema upgrade so a vault one version behind becomes
    /// usable without any explicit migration step.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SecretKeeperError::VaultNotInitialized(path.to_path_buf()));
        }

        let conn = Connection::open(path)?;
        schema::apply_pragmas(&conn)?;
        schema::migrate(&conn)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            master: None,
        })
    }

    /// Load master key material, verifying it against the stored data.
    ///
    /// Verification decrypts the first secret row; an empty vault accepts
    /// any key (there is nothing to contradict it yet).
    pub fn load_key(&mut self, key: &[u8]) -> Result<()> {
        let probe: Option<String> = self
            .conn
            .query_row("SELECT value FROM secrets LIMIT 1", [], |row| row.get(0))
            .optional()?;

        if let Some(blob) = probe {
            let mut plain = decrypt(&blob, key)?;
            plain.zeroize();
        }

        self.master = Some(MasterKey::new(key.to_vec()));
        audit::append(&self.conn, AuditAction::VaultUnlocked, None, None)?;
        Ok(())
    }

    /// Drop the loaded key material, wiping it first.
    pub fn lock(&mut self) -> Result<()> {
        if let Some(mut master) = self.master.take() {
            master.zeroize();
            audit::append(&self.conn, AuditAction::VaultLocked, None, None)?;
        }
        Ok(())
    }

    pub fn is_unlocked(&self) -> bool {
        self.master.is_some()
    }

    pub(super) fn master(&self) -> Result<&MasterKey> {
        self.master.as_ref().ok_or(SecretKeeperError::VaultLocked)
    }

    // ------------------------------------------------------------------
    // Secret operations
    // ------------------------------------------------------------------

    /// Add or update a secret.  Updates preserve `created_at`.
    pub fn add_secret(&mut self, name: &str, value: &str, opts: &SecretOptions) -> Result<()> {
        validate_secret_name(name)?;
        let blob = encrypt(value.as_bytes(), self.master()?.as_bytes())?;

        let now = Utc::now().to_rfc3339();
        let tags_json = serde_json::to_string(&opts.tags)
            .map_err(|e| SecretKeeperError::SerializationError(e.to_string()))?;
        let sensitivity = opts.sensitivity.unwrap_or(Sensitivity::Sensitive);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO secrets (name, value, created_at, updated_at, description, tags, sensitive)
             VALUES (?1, ?2, ?3, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at,
                 description = excluded.description,
                 tags = excluded.tags,
                 sensitive = excluded.sensitive",
            rusqlite::params![
                name,
                blob,
                now,
                opts.description,
                tags_json,
                sensitivity.flag()
            ],
        )?;
        audit::append(&tx, AuditAction::SecretAdded, Some(name), None)?;
        tx.commit()?;

        Ok(())
    }

    /// Decrypt and return the plaintext value of a secret.
    pub fn get_secret(&self, name: &str) -> Result<String> {
        validate_secret_name(name)?;
        let master = self.master()?;

        let blob: Option<String> = self
            .conn
            .query_row("SELECT value FROM secrets WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()?;

        let blob = blob.ok_or_else(|| SecretKeeperError::SecretNotFound(name.to_string()))?;
        let plaintext = decrypt(&blob, master.as_bytes())?;

        String::from_utf8(plaintext).map_err(|e| {
            let mut bad = e.into_bytes();
            bad.zeroize();
            SecretKeeperError::SerializationError("secret value is not valid UTF-8".into())
        })
    }

    /// Decrypt every secret into a name -> plaintext map.
    ///
    /// Used by the daemon to build its in-memory secret set.
    pub fn get_all_secrets(&self) -> Result<HashMap<String, String>> {
        let master = self.master()?;

        let mut stmt = self.conn.prepare("SELECT name, value FROM secrets")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (name, blob) = row?;
            let plaintext = decrypt(&blob, master.as_bytes())?;
            let value = String::from_utf8(plaintext).map_err(|e| {
                let mut bad = e.into_bytes();
                bad.zeroize();
                SecretKeeperError::SerializationError(format!("secret '{name}' is not valid UTF-8"))
            })?;
            map.insert(name, value);
        }

        Ok(map)
    }

    /// List metadata for all secrets, sorted by name.  Needs no key.
    pub fn list_secrets(&self) -> Result<Vec<SecretMetadata>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, created_at, updated_at, description, tags, sensitive
             FROM secrets ORDER BY name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ))
        })?;

        let mut list = Vec::new();
        for row in rows {
            let (name, created, updated, description, tags, flag) = row?;
            list.push(SecretMetadata {
                name,
                created_at: parse_ts(&created),
                updated_at: parse_ts(&updated),
                description,
                tags: tags
                    .as_deref()
                    .and_then(|t| serde_json::from_str(t).ok())
                    .unwrap_or_default(),
                sensitivity: Sensitivity::from_flag(flag),
            });
        }

        Ok(list)
    }

    /// Remove a secret and its rotation config.
    pub fn delete_secret(&mut self, name: &str) -> Result<()> {
        validate_secret_name(name)?;

        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM secrets WHERE name = ?1", [name])?;
        if removed == 0 {
            return Err(SecretKeeperError::SecretNotFound(name.to_string()));
        }
        tx.execute("DELETE FROM rotation_config WHERE secret_name = ?1", [name])?;
        audit::append(&tx, AuditAction::SecretDeleted, Some(name), None)?;
        tx.commit()?;

        Ok(())
    }

    /// Number of stored secrets.
    pub fn count_secrets(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM secrets", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ------------------------------------------------------------------
    // Master key change
    // ------------------------------------------------------------------

    /// Re-encrypt every secret under a new master key, atomically.
    ///
    /// If any row fails to decrypt under `old_key` the transaction is
    /// rolled back and the old key remains authoritative.
    pub fn change_master_key(&mut self, old_key: &[u8], new_key: &[u8]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("SELECT name, value FROM secrets")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut reencrypted: Vec<(String, String)> = Vec::new();
            for row in rows {
                let (name, blob) = row?;
                let mut plaintext = decrypt(&blob, old_key)?;
                let new_blob = encrypt(&plaintext, new_key)?;
                plaintext.zeroize();
                reencrypted.push((name, new_blob));
            }

            let now = Utc::now().to_rfc3339();
            for (name, blob) in &reencrypted {
                tx.execute(
                    "UPDATE secrets SET value = ?1, updated_at = ?2 WHERE name = ?3",
                    rusqlite::params![blob, now, name],
                )?;
            }

            audit::append(
                &tx,
                AuditAction::MasterKeyChanged,
                None,
                Some(&format!("{} secrets re-encrypted", reencrypted.len())),
            )?;
        }
        tx.commit()?;

        self.master = Some(MasterKey::new(new_key.to_vec()));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Import / export
    // ------------------------------------------------------------------

    /// Import `.env`-style content.
    ///
    /// Sensitive-looking names are stored masked; the rest become visible
    /// credentials.  With `secrets_only`, config-looking names are
    /// skipped entirely.  All writes happen in one transaction.
    pub fn import_from_env(&mut self, content: &str, secrets_only: bool) -> Result<ImportSummary> {
        let master_bytes = self.master()?.as_bytes().to_vec();
        let entries = parse_env_content(content);
        let mut summary = ImportSummary::default();

        let tx = self.conn.transaction()?;
        for entry in &entries {
            if should_skip(entry, secrets_only) {
                summary.skipped.push(entry.name.clone());
                continue;
            }
            if validate_secret_name(&entry.name).is_err() {
                summary.skipped.push(entry.name.clone());
                continue;
            }

            let blob = encrypt(entry.value.as_bytes(), &master_bytes)?;
            let now = Utc::now().to_rfc3339();
            let sensitivity = if entry.sensitive {
                Sensitivity::Sensitive
            } else {
                Sensitivity::Credential
            };

            tx.execute(
                "INSERT INTO secrets (name, value, created_at, updated_at, tags, sensitive)
                 VALUES (?1, ?2, ?3, ?3, '[]', ?4)
                 ON CONFLICT(name) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at,
                     sensitive = excluded.sensitive",
                rusqlite::params![entry.name, blob, now, sensitivity.flag()],
            )?;
            audit::append(&tx, AuditAction::SecretAdded, Some(&entry.name), Some("imported"))?;

            if entry.sensitive {
                summary.secrets.push(entry.name.clone());
            } else {
                summary.credentials.push(entry.name.clone());
            }
        }
        tx.commit()?;

        Ok(summary)
    }

    /// Render every secret as `KEY=VALUE` lines, sorted by name.
    pub fn export_env(&self) -> Result<String> {
        let map = self.get_all_secrets()?;
        let mut names: Vec<&String> = map.keys().collect();
        names.sort();

        let mut out = String::new();
        for name in &names {
            out.push_str(name);
            out.push('=');
            out.push_str(&map[name.as_str()]);
            out.push('\n');
        }

        audit::append(
            &self.conn,
            AuditAction::SecretsExported,
            None,
            Some(&format!("{} secrets", names.len())),
        )?;

        Ok(out)
    }

    // ------------------------------------------------------------------
    // Audit access
    // ------------------------------------------------------------------

    /// Recent audit entries, most recent first.
    pub fn audit_entries(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        audit::query(&self.conn, limit)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(super) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Drop for VaultStore {
    fn drop(&mut self) {
        if let Some(mut master) = self.master.take() {
            master.zeroize();
        }
    }
}

pub(super) fn parse_ts(value: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
