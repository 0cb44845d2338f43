//! Integration tests for the rotation manager and its vault tables.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use secret_keeper::errors::SecretKeeperError;
use secret_keeper::rotation::RotationManager;
use secret_keeper::vault::{RotationConfig, SecretOptions, VaultStore};
use serde_json::json;
use tempfile::TempDir;

const KEY: &[u8] = b"rotation-test-key";

fn vault_with_secret(name: &str, value: &str) -> (TempDir, Arc<Mutex<VaultStore>>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".secret-keeper").join("secrets.db");
    let mut store = VaultStore::initialize(&path, KEY).unwrap();
    store.add_secret(name, value, &SecretOptions::default()).unwrap();
    (dir, Arc::new(Mutex::new(store)))
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn configure_validates_provider_and_schedule() {
    let (_dir, vault) = vault_with_secret("TOKEN", "tok-1");
    let manager = RotationManager::new(Arc::clone(&vault));

    // Unknown provider tag fails fast.
    assert!(matches!(
        manager.configure("TOKEN", "nonsense", 30, json!({})),
        Err(SecretKeeperError::UnknownProvider(_))
    ));

    // Invalid provider config fails fast.
    assert!(manager.configure("TOKEN", "custom", 30, json!({})).is_err());

    // Zero-day schedules are rejected.
    assert!(manager
        .configure("TOKEN", "custom", 0, json!({"rotateCommand": "echo x"}))
        .is_err());

    // Missing secret fails.
    assert!(manager
        .configure("MISSING", "custom", 30, json!({"rotateCommand": "echo x"}))
        .is_err());

    // A valid config lands with next_rotation about `days` out.
    manager
        .configure("TOKEN", "custom", 30, json!({"rotateCommand": "echo x"}))
        .unwrap();
    let config = manager.get("TOKEN").unwrap().expect("config stored");
    assert_eq!(config.provider, "custom");
    assert_eq!(config.schedule_days, 30);
    assert!(config.enabled);
    assert!(config.last_rotated.is_none());
    let next = config.next_rotation.expect("next_rotation set");
    assert!(next > Utc::now() + Duration::days(29));
}

#[test]
fn enable_disable_delete_roundtrip() {
    let (_dir, vault) = vault_with_secret("TOKEN", "tok-1");
    let manager = RotationManager::new(vault);
    manager
        .configure("TOKEN", "custom", 7, json!({"rotateCommand": "echo x"}))
        .unwrap();

    manager.disable("TOKEN").unwrap();
    assert!(!manager.get("TOKEN").unwrap().unwrap().enabled);

    manager.enable("TOKEN").unwrap();
    assert!(manager.get("TOKEN").unwrap().unwrap().enabled);

    assert!(manager.delete("TOKEN").unwrap());
    assert!(manager.get("TOKEN").unwrap().is_none());
    assert!(!manager.delete("TOKEN").unwrap());
}

// ---------------------------------------------------------------------------
// Due computation (invariant: enabled ∧ (null ∨ past-due))
// ---------------------------------------------------------------------------

#[test]
fn due_now_matches_the_invariant() {
    let (_dir, vault) = vault_with_secret("A", "va");
    {
        let mut store = vault.lock().unwrap();
        store.add_secret("B", "vb", &SecretOptions::default()).unwrap();
        store.add_secret("C", "vc", &SecretOptions::default()).unwrap();

        let base = RotationConfig {
            secret_name: String::new(),
            provider: "custom".into(),
            schedule_days: 30,
            last_rotated: None,
            next_rotation: None,
            enabled: true,
            provider_config: json!({"rotateCommand": "echo x"}),
        };

        // Never rotated: due.
        store
            .upsert_rotation_config(&RotationConfig {
                secret_name: "A".into(),
                ..base.clone()
            })
            .unwrap();
        // Far-future next_rotation: not due.
        store
            .upsert_rotation_config(&RotationConfig {
                secret_name: "B".into(),
                last_rotated: Some(Utc::now()),
                next_rotation: Some(Utc::now() + Duration::days(30)),
                ..base.clone()
            })
            .unwrap();
        // Disabled: never due.
        store
            .upsert_rotation_config(&RotationConfig {
                secret_name: "C".into(),
                enabled: false,
                ..base.clone()
            })
            .unwrap();
    }

    let manager = RotationManager::new(vault);
    let due: Vec<String> = manager
        .due_now()
        .unwrap()
        .into_iter()
        .map(|c| c.secret_name)
        .collect();
    assert_eq!(due, vec!["A"]);
}

#[test]
fn due_now_orders_by_next_rotation() {
    let (_dir, vault) = vault_with_secret("EARLY", "v1");
    {
        let mut store = vault.lock().unwrap();
        store.add_secret("LATE", "v2", &SecretOptions::default()).unwrap();

        for (name, hours_ago) in [("LATE", 1), ("EARLY", 48)] {
            store
                .upsert_rotation_config(&RotationConfig {
                    secret_name: name.into(),
                    provider: "custom".into(),
                    schedule_days: 1,
                    last_rotated: Some(Utc::now() - Duration::hours(hours_ago + 24)),
                    next_rotation: Some(Utc::now() - Duration::hours(hours_ago)),
                    enabled: true,
                    provider_config: json!({"rotateCommand": "echo x"}),
                })
                .unwrap();
        }
    }

    let manager = RotationManager::new(vault);
    let due: Vec<String> = manager
        .due_now()
        .unwrap()
        .into_iter()
        .map(|c| c.secret_name)
        .collect();
    assert_eq!(due, vec!["EARLY", "LATE"]);
}

// ---------------------------------------------------------------------------
// Rotation hot path
// ---------------------------------------------------------------------------

#[test]
fn rotate_now_replaces_value_and_appends_history() {
    let (_dir, vault) = vault_with_secret("TOKEN", "old-token");
    let manager = RotationManager::new(Arc::clone(&vault));
    manager
        .configure("TOKEN", "custom", 30, json!({"rotateCommand": "echo fresh-token"}))
        .unwrap();

    manager.rotate_now("TOKEN").unwrap();

    let store = vault.lock().unwrap();
    assert_eq!(store.get_secret("TOKEN").unwrap(), "fresh-token");

    let config = store.get_rotation_config("TOKEN").unwrap().unwrap();
    let last = config.last_rotated.expect("last_rotated set");
    let next = config.next_rotation.expect("next_rotation set");
    assert_eq!((next - last).num_days(), 30);

    let history = store.rotation_history(Some("TOKEN"), 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "success");
    assert_eq!(history[0].provider, "custom");
    assert!(history[0].error.is_none());
}

#[test]
fn failed_rotation_keeps_old_value_and_records_failure() {
    let (_dir, vault) = vault_with_secret("TOKEN", "old-token");
    let manager = RotationManager::new(Arc::clone(&vault));
    manager
        .configure(
            "TOKEN",
            "custom",
            30,
            json!({"rotateCommand": "echo oops >&2; exit 3"}),
        )
        .unwrap();

    assert!(matches!(
        manager.rotate_now("TOKEN"),
        Err(SecretKeeperError::RotationError(_))
    ));

    let store = vault.lock().unwrap();
    // Old value intact, schedule untouched.
    assert_eq!(store.get_secret("TOKEN").unwrap(), "old-token");
    let config = store.get_rotation_config("TOKEN").unwrap().unwrap();
    assert!(config.last_rotated.is_none());

    let history = store.rotation_history(Some("TOKEN"), 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "failed");
    let err = history[0].error.as_deref().expect("error recorded");
    assert!(err.contains("oops") || err.contains("exit"), "got: {err}");
}

#[test]
fn run_due_rotates_sequentially_and_reports_outcomes() {
    let (_dir, vault) = vault_with_secret("GOOD", "g1");
    {
        let mut store = vault.lock().unwrap();
        store.add_secret("BAD", "b1", &SecretOptions::default()).unwrap();
    }

    let manager = RotationManager::new(Arc::clone(&vault));
    manager
        .configure("GOOD", "custom", 1, json!({"rotateCommand": "echo g2"}))
        .unwrap();
    manager
        .configure("BAD", "custom", 1, json!({"rotateCommand": "false"}))
        .unwrap();

    // Force both due.
    {
        let mut store = vault.lock().unwrap();
        for name in ["GOOD", "BAD"] {
            let mut config = store.get_rotation_config(name).unwrap().unwrap();
            config.next_rotation = Some(Utc::now() - Duration::hours(1));
            store.upsert_rotation_config(&config).unwrap();
        }
    }

    let outcomes = manager.run_due();
    assert_eq!(outcomes.len(), 2);

    let good = outcomes.iter().find(|o| o.secret_name == "GOOD").unwrap();
    assert!(good.success);
    let bad = outcomes.iter().find(|o| o.secret_name == "BAD").unwrap();
    assert!(!bad.success);
    assert!(bad.error.is_some());

    let store = vault.lock().unwrap();
    assert_eq!(store.get_secret("GOOD").unwrap(), "g2");
    assert_eq!(store.get_secret("BAD").unwrap(), "b1");
}

#[test]
fn test_rotate_is_a_dry_run() {
    let (_dir, vault) = vault_with_secret("TOKEN", "current");
    let manager = RotationManager::new(Arc::clone(&vault));
    manager
        .configure(
            "TOKEN",
            "custom",
            30,
            // Succeeds only when DRY_RUN is set, proving the flag reaches it.
            json!({"rotateCommand": "test \"$DRY_RUN\" = 1 && echo would-rotate"}),
        )
        .unwrap();

    assert!(manager.test("TOKEN").unwrap());

    // Nothing mutated.
    let store = vault.lock().unwrap();
    assert_eq!(store.get_secret("TOKEN").unwrap(), "current");
    assert!(store.rotation_history(Some("TOKEN"), 10).unwrap().is_empty());
}
