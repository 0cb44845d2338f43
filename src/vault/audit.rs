//! Append-only audit log inside the vault database.
//!
//! Every mutating vault operation records what happened, when, and to
//! which secret.  Rows are never updated or deleted by the core.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::errors::Result;

/// Closed set of auditable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    VaultInitialized,
    VaultUnlocked,
    VaultLocked,
    SecretAdded,
    SecretDeleted,
    SecretsExported,
    MasterKeyChanged,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VaultInitialized => "vault_initialized",
            Self::VaultUnlocked => "vault_unlocked",
            Self::VaultLocked => "vault_locked",
            Self::SecretAdded => "secret_added",
            Self::SecretDeleted => "secret_deleted",
            Self::SecretsExported => "secrets_exported",
            Self::MasterKeyChanged => "master_key_changed",
        }
    }
}

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub secret_name: Option<String>,
    pub details: Option<String>,
}

/// Append an audit row on an open connection (or transaction).
pub fn append(
    conn: &Connection,
    action: AuditAction,
    secret_name: Option<&str>,
    details: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO audit_log (timestamp, action, secret_name, details)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![Utc::now().to_rfc3339(), action.as_str(), secret_name, details],
    )?;
    Ok(())
}

/// Query recent audit entries, most recent first.
pub fn query(conn: &Connection, limit: usize) -> Result<Vec<AuditEntry>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, action, secret_name, details
         FROM audit_log
         ORDER BY id DESC
         LIMIT ?1",
    )?;

    let rows = stmt.query_map([limit], |row| {
        let ts: String = row.get(1)?;
        Ok(AuditEntry {
            id: row.get(0)?,
            timestamp: DateTime::parse_from_rfc3339(&ts)
                .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
            action: row.get(2)?,
            secret_name: row.get(3)?,
            details: row.get(4)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn append_and_query_roundtrip() {
        let conn = conn();

        append(&conn, AuditAction::VaultInitialized, None, None).unwrap();
        append(&conn, AuditAction::SecretAdded, Some("API_KEY"), Some("added")).unwrap();
        append(&conn, AuditAction::SecretDeleted, Some("OLD_KEY"), None).unwrap();

        let entries = query(&conn, 10).unwrap();
        assert_eq!(entries.len(), 3);

        // Most recent first.
        assert_eq!(entries[0].action, "secret_deleted");
        assert_eq!(entries[1].action, "secret_added");
        assert_eq!(entries[1].secret_name.as_deref(), Some("API_KEY"));
        assert_eq!(entries[2].action, "vault_initialized");
    }

    #[test]
    fn ids_are_monotone() {
        let conn = conn();
        for _ in 0..5 {
            append(&conn, AuditAction::VaultUnlocked, None, None).unwrap();
        }
        let entries = query(&conn, 10).unwrap();
        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn query_respects_limit() {
        let conn = conn();
        for _ in 0..10 {
            append(&conn, AuditAction::SecretAdded, Some("K"), None).unwrap();
        }
        assert_eq!(query(&conn, 3).unwrap().len(), 3);
    }
}
