//! SQLite schema bootstrap and lazy version upgrades.
//!
//! Five relations: vault metadata, secrets, audit log, rotation config,
//! rotation history.  A vault one schema version behind is upgraded in
//! place the first time it is opened: missing tables and missing columns
//! are added, nothing is dropped.  Schema v1 additionally carried a
//! `password_verifier` row in `vault_meta`; v2 ignores it and never
//! writes one — invalid keys surface as a failed auth tag instead.

use rusqlite::Connection;

use crate::errors::Result;

/// Current schema version string stored in `vault_meta`.
pub const SCHEMA_VERSION: &str = "2";

/// Apply durability pragmas: write-ahead journal, full synchronous.
pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    Ok(())
}

/// Create any missing tables and columns.  Idempotent; safe to run on
/// every open.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS vault_meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS secrets (
            name        TEXT PRIMARY KEY,
            value       TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            description TEXT,
            tags        TEXT
        );
        CREATE TABLE IF NOT EXISTS audit_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp   TEXT NOT NULL,
            action      TEXT NOT NULL,
            secret_name TEXT,
            details     TEXT
        );
        CREATE TABLE IF NOT EXISTS rotation_config (
            secret_name     TEXT PRIMARY KEY,
            provider        TEXT NOT NULL,
            schedule_days   INTEGER NOT NULL,
            last_rotated    TEXT,
            next_rotation   TEXT,
            enabled         INTEGER NOT NULL DEFAULT 1,
            provider_config TEXT NOT NULL DEFAULT '{}'
        );
        CREATE TABLE IF NOT EXISTS rotation_history (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            secret_name TEXT NOT NULL,
            timestamp   TEXT NOT NULL,
            status      TEXT NOT NULL,
            provider    TEXT NOT NULL,
            error       TEXT
        );",
    )?;

    // v1 secrets tables predate the sensitivity column.
    if !column_exists(conn, "secrets", "sensitive")? {
        conn.execute(
            "ALTER TABLE secrets ADD COLUMN sensitive INTEGER NOT NULL DEFAULT 1",
            [],
        )?;
    }

    // Record the version we now satisfy.  No downgrade path exists.
    conn.execute(
        "INSERT INTO vault_meta (key, value) VALUES ('version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = ?1",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        let version: String = conn
            .query_row(
                "SELECT value FROM vault_meta WHERE key = 'version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn upgrades_v1_secrets_table() {
        let conn = Connection::open_in_memory().unwrap();

        // Shape of a v1 vault: no sensitivity column, a password verifier row.
        conn.execute_batch(
            "CREATE TABLE vault_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
             INSERT INTO vault_meta VALUES ('version', '1');
             INSERT INTO vault_meta VALUES ('created_at', '2023-01-01T00:00:00Z');
             INSERT INTO vault_meta VALUES ('password_verifier', 'legacy-hash');
             CREATE TABLE secrets (
                 name TEXT PRIMARY KEY,
                 value TEXT NOT NULL,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL,
                 description TEXT,
                 tags TEXT
             );
             INSERT INTO secrets VALUES
                 ('OLD', 'blob', '2023-01-01T00:00:00Z', '2023-01-01T00:00:00Z', NULL, NULL);",
        )
        .unwrap();

        migrate(&conn).unwrap();

        // Legacy row still present and readable, now flagged sensitive.
        let flag: i64 = conn
            .query_row("SELECT sensitive FROM secrets WHERE name = 'OLD'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(flag, 1);

        // Verifier row is tolerated, not removed.
        let verifier: String = conn
            .query_row(
                "SELECT value FROM vault_meta WHERE key = 'password_verifier'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(verifier, "legacy-hash");

        let version: String = conn
            .query_row("SELECT value FROM vault_meta WHERE key = 'version'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
