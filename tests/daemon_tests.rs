//! End-to-end daemon tests: real socket, real children, real scrubbing.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use secret_keeper::config::Settings;
use secret_keeper::daemon::{server, Daemon, DaemonClient};
use secret_keeper::errors::SecretKeeperError;
use secret_keeper::vault::{SecretOptions, VaultStore};
use tempfile::TempDir;
use tokio::task::JoinHandle;

const KEY: &[u8] = b"daemon-test-key";

struct TestDaemon {
    _dir: TempDir,
    daemon: Arc<Daemon>,
    handle: JoinHandle<secret_keeper::errors::Result<()>>,
    socket: PathBuf,
}

impl TestDaemon {
    fn client(&self) -> DaemonClient {
        DaemonClient::at(self.socket.clone()).with_timeout(Duration::from_secs(10))
    }

    async fn stop(self) {
        self.daemon.request_shutdown();
        let _ = self.handle.await;
    }
}

async fn start_daemon(secrets: &[(&str, &str)]) -> TestDaemon {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join(".secret-keeper").join("secrets.db");
    let mut store = VaultStore::initialize(&db, KEY).unwrap();
    for (name, value) in secrets {
        store.add_secret(name, value, &SecretOptions::default()).unwrap();
    }

    let socket = dir.path().join("sk.sock");
    let daemon = Daemon::new(store, socket.clone(), &Settings::default()).unwrap();
    let handle = tokio::spawn(server::run(Arc::clone(&daemon)));

    // Wait for the listener to come up.
    let client = DaemonClient::at(socket.clone());
    for _ in 0..100 {
        if daemon.is_running() && client.is_running() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(daemon.is_running(), "daemon failed to start");

    TestDaemon {
        _dir: dir,
        daemon,
        handle,
        socket,
    }
}

/// Raw one-shot request for protocol-level tests.
fn raw_request(socket: &PathBuf, payload: &[&[u8]], pause: Duration) -> String {
    let mut stream = std::os::unix::net::UnixStream::connect(socket).unwrap();
    for chunk in payload {
        stream.write_all(chunk).unwrap();
        stream.flush().unwrap();
        std::thread::sleep(pause);
    }
    stream.shutdown(std::net::Shutdown::Write).unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

// ---------------------------------------------------------------------------
// Basic request set
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ping_reports_loaded_secret_count() {
    let td = start_daemon(&[("ALPHA", "value-a"), ("BETA", "value-b")]).await;

    let count = td.client().ping().unwrap();
    assert_eq!(count, 2);

    td.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn list_returns_names_and_never_values() {
    let td = start_daemon(&[("API_KEY", "super-sensitive-value")]).await;

    let names = td.client().list().unwrap();
    assert_eq!(names, vec!["API_KEY"]);

    // Inspect the raw bytes of the response too: not one byte of the
    // plaintext may cross the socket.
    let raw = raw_request(&td.socket, &[br#"{"action":"list"}"#], Duration::ZERO);
    assert!(raw.contains("API_KEY"));
    assert!(!raw.contains("super-sensitive-value"));

    td.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_action_yields_error_object() {
    let td = start_daemon(&[]).await;

    let raw = raw_request(&td.socket, &[br#"{"action":"frobnicate"}"#], Duration::ZERO);
    assert!(raw.contains("\"error\""), "got: {raw}");

    td.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn request_may_cross_packet_boundaries() {
    let td = start_daemon(&[("X_TOKEN", "abcdefg")]).await;

    let raw = raw_request(
        &td.socket,
        &[br#"{"action":"#, br#""ping"}"#],
        Duration::from_millis(100),
    );
    assert!(raw.contains("\"secretsLoaded\":1"), "got: {raw}");

    td.stop().await;
}

// ---------------------------------------------------------------------------
// Exec
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exec_injects_and_scrubs_interpolated_secret() {
    let td = start_daemon(&[("NAME", "world")]).await;

    let result = td.client().exec("echo hello $NAME", None, Some(30)).unwrap();

    // The shell interpolates; the scrubber then redacts.
    assert_eq!(result.exit_code, 0);
    assert!(!result.blocked);
    assert_eq!(result.stdout, "hello [REDACTED:NAME]\n");
    assert_eq!(result.stderr, "");

    td.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exec_scrubs_stderr_too() {
    let td = start_daemon(&[("TOKEN", "hunter2-value")]).await;

    // Redirect first so no `$VAR >` sequence trips the policy filter.
    let result = td
        .client()
        .exec(">&2 echo leaked $TOKEN; exit 7", None, Some(30))
        .unwrap();

    assert_eq!(result.exit_code, 7);
    assert_eq!(result.stderr, "leaked [REDACTED:TOKEN]\n");

    td.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exec_respects_cwd() {
    let td = start_daemon(&[]).await;
    let workdir = TempDir::new().unwrap();
    std::fs::write(workdir.path().join("probe.txt"), "here").unwrap();

    let result = td
        .client()
        .exec(
            "cat probe.txt",
            Some(workdir.path().to_string_lossy().into_owned()),
            Some(30),
        )
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "here");

    td.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blocked_command_matches_contract_and_spawns_nothing() {
    let td = start_daemon(&[("SECRET_ONE", "value-1")]).await;
    let marker = td._dir.path().join("marker");

    let result = td
        .client()
        .exec(
            &format!("env && touch {}", marker.display()),
            None,
            Some(30),
        )
        .unwrap();

    assert_eq!(result.exit_code, 1);
    assert!(result.blocked);
    assert_eq!(
        result.block_reason.as_deref(),
        Some("Command 'env' is blocked for security")
    );
    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr, "BLOCKED: Command 'env' is blocked for security");

    // A blocked command must never reach a shell.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!marker.exists());

    td.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exec_timeout_kills_the_child() {
    let td = start_daemon(&[]).await;

    let started = Instant::now();
    let result = td
        .client()
        .exec("sleep 30; echo survived", None, Some(1))
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(result.exit_code, 1, "killed children report exit 1");
    assert!(!result.stdout.contains("survived"));

    td.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_execs_run_in_parallel() {
    let td = start_daemon(&[]).await;
    let socket = td.socket.clone();

    let started = Instant::now();
    let mut workers = Vec::new();
    for _ in 0..3 {
        let socket = socket.clone();
        workers.push(std::thread::spawn(move || {
            DaemonClient::at(socket)
                .with_timeout(Duration::from_secs(30))
                .exec("sleep 1", None, Some(30))
                .unwrap()
        }));
    }
    for worker in workers {
        let result = worker.join().unwrap();
        assert_eq!(result.exit_code, 0);
    }

    // Three one-second sleeps done in clearly under sequential time.
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "execs appear serialized: {:?}",
        started.elapsed()
    );

    td.stop().await;
}

// ---------------------------------------------------------------------------
// Rotation reload: the (map, scrubber) pair swaps as one unit
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reload_after_rotation_scrubs_new_value_not_old() {
    let td = start_daemon(&[("TOKEN", "old-value-one")]).await;

    // Rotate through the daemon's own manager, then reload.
    let manager = td.daemon.rotation_manager();
    manager
        .configure(
            "TOKEN",
            "custom",
            30,
            serde_json::json!({"rotateCommand": "echo new-value-two"}),
        )
        .unwrap();
    tokio::task::spawn_blocking(move || manager.rotate_now("TOKEN"))
        .await
        .unwrap()
        .unwrap();
    td.daemon.reload_secrets().unwrap();

    let client = td.client();
    let result = client.exec("echo token=$TOKEN", None, Some(30)).unwrap();
    assert_eq!(result.stdout, "token=[REDACTED:TOKEN]\n");

    // The old plaintext is no longer a secret; it passes through.
    let result = client.exec("echo old-value-one", None, Some(30)).unwrap();
    assert_eq!(result.stdout, "old-value-one\n");

    td.stop().await;
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_request_tears_down_cleanly() {
    let td = start_daemon(&[("K_ONE", "value-here")]).await;
    let socket = td.socket.clone();

    td.client().shutdown().unwrap();
    let _ = td.handle.await;

    assert!(!td.daemon.is_running());
    assert!(!socket.exists(), "socket file must be unlinked");

    let err = DaemonClient::at(socket).ping().unwrap_err();
    assert!(matches!(err, SecretKeeperError::DaemonNotRunning));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stale_socket_file_is_replaced_on_start() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join(".secret-keeper").join("secrets.db");
    let store = VaultStore::initialize(&db, KEY).unwrap();

    // Simulate a crashed instance leaving its socket behind.
    let socket = dir.path().join("sk.sock");
    drop(std::os::unix::net::UnixListener::bind(&socket).unwrap());
    assert!(socket.exists());

    let daemon = Daemon::new(store, socket.clone(), &Settings::default()).unwrap();
    let handle = tokio::spawn(server::run(Arc::clone(&daemon)));

    let client = DaemonClient::at(socket);
    for _ in 0..100 {
        if client.is_running() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(client.ping().unwrap(), 0);

    daemon.request_shutdown();
    let _ = handle.await;
}
