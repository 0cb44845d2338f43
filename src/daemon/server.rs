//! The daemon's accept loop and request handlers.
//!
//! One JSON request per connection: the server reads until a complete
//! JSON object parses (requests may cross packet boundaries), processes
//! it, writes one JSON response, and closes.  Command execution holds no
//! global lock, so concurrent `exec` children run in parallel.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

use crate::errors::{Result, SecretKeeperError};
use crate::policy;

use super::protocol::{ExecResult, Request, Response, MAX_MESSAGE_SIZE};
use super::Daemon;

/// Bind the socket and serve requests until shutdown.
///
/// On start: create the socket directory if absent, unlink any stale
/// socket file, bind, restrict permissions, install signal handlers.
pub async fn run(daemon: Arc<Daemon>) -> Result<()> {
    let socket_path = daemon.socket_path().to_path_buf();

    if let Some(parent) = socket_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
        }
    }

    // A crashed previous instance leaves its socket file behind.
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }

    let listener = UnixListener::bind(&socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut shutdown_rx = daemon.shutdown_receiver();

    daemon.start_scheduler();
    daemon.mark_running(true);
    info!(socket = %socket_path.display(), "daemon listening");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let daemon = Arc::clone(&daemon);
                        tokio::spawn(async move {
                            handle_connection(daemon, stream).await;
                        });
                    }
                    Err(err) => warn!(error = %err, "failed to accept connection"),
                }
            }

            _ = sigint.recv() => {
                info!("interrupt received");
                break;
            }

            _ = sigterm.recv() => {
                info!("termination signal received");
                break;
            }

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("shutdown requested");
                    break;
                }
            }
        }
    }

    drop(listener);
    daemon.teardown().await;
    Ok(())
}

/// Serve a single connection: one request, one response, close.
async fn handle_connection(daemon: Arc<Daemon>, mut stream: UnixStream) {
    let response = match read_request(&mut stream).await {
        Ok(Some(request)) => {
            debug!(?request, "request received");
            let shutdown_after = matches!(request, Request::Shutdown);
            let response = dispatch(&daemon, request).await;
            if shutdown_after {
                // Acknowledge first, then tear down.
                write_response(&mut stream, &response).await;
                daemon.request_shutdown();
                return;
            }
            response
        }
        Ok(None) => return, // Client connected and went away; nothing to answer.
        Err(err) => Response::Error {
            error: err.to_string(),
        },
    };

    write_response(&mut stream, &response).await;
}

async fn write_response(stream: &mut UnixStream, response: &Response) {
    let Ok(bytes) = serde_json::to_vec(response) else {
        return;
    };
    if let Err(err) = stream.write_all(&bytes).await {
        debug!(error = %err, "failed to write response");
        return;
    }
    let _ = stream.shutdown().await;
}

/// Read until a complete JSON object parses, the client half-closes, or
/// the size cap is hit.
async fn read_request(stream: &mut UnixStream) -> Result<Option<Request>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            // Half-close from the client.
            if buf.is_empty() {
                return Ok(None);
            }
            return parse_request(&buf).map(Some);
        }

        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_MESSAGE_SIZE {
            return Err(SecretKeeperError::Protocol(format!(
                "message exceeds {MAX_MESSAGE_SIZE} bytes"
            )));
        }

        // Requests may arrive across packet boundaries; keep reading
        // until the buffer parses as a complete object.
        if serde_json::from_slice::<serde_json::Value>(&buf).is_ok() {
            return parse_request(&buf).map(Some);
        }
    }
}

fn parse_request(buf: &[u8]) -> Result<Request> {
    serde_json::from_slice(buf)
        .map_err(|e| SecretKeeperError::Protocol(format!("invalid request: {e}")))
}

async fn dispatch(daemon: &Arc<Daemon>, request: Request) -> Response {
    match request {
        Request::Ping => Response::Ping {
            status: "ok".into(),
            secrets_loaded: daemon.current_epoch().secrets.len(),
        },

        // Names only — values never cross this boundary.
        Request::List => {
            let epoch = daemon.current_epoch();
            let mut names: Vec<String> = epoch.secrets.keys().cloned().collect();
            names.sort();
            Response::List { secrets: names }
        }

        Request::Exec { command, cwd, timeout } => {
            Response::Exec(handle_exec(daemon, &command, cwd.as_deref(), timeout).await)
        }

        Request::Shutdown => Response::Ack { status: "ok".into() },
    }
}

/// Run one command through policy, injection, capture, and scrubbing.
async fn handle_exec(
    daemon: &Arc<Daemon>,
    command: &str,
    cwd: Option<&str>,
    timeout_secs: Option<u64>,
) -> ExecResult {
    if let policy::Decision::Blocked(reason) = policy::validate(command) {
        info!(command, reason = %reason, "command blocked by policy");
        return ExecResult::blocked(reason);
    }

    let epoch = daemon.current_epoch();
    let timeout = timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| daemon.default_exec_timeout());

    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // Secrets override any same-named variables from the daemon's
        // own environment.
        .envs(&epoch.secrets)
        .process_group(0)
        .kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return ExecResult {
                exit_code: 1,
                stdout: String::new(),
                stderr: epoch.scrubber.scrub(&format!("failed to spawn: {err}")),
                blocked: false,
                block_reason: None,
            };
        }
    };

    let pid = child.id();

    // Drain both pipes concurrently so neither can fill and deadlock the
    // child; the readers finish once the pipes close.
    let mut stdout_pipe = child.stdout.take();
    let mut stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });

    let mut stderr_pipe = child.stderr.take();
    let mut stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });

    // One deadline covers the wait and both pipe drains, so a
    // backgrounded grandchild holding the pipes cannot stall the
    // response past the timeout.
    let deadline = tokio::time::Instant::now() + timeout;

    let status = match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(err)) => {
            warn!(error = %err, "failed waiting for child");
            None
        }
        Err(_elapsed) => {
            warn!(command, timeout_secs = timeout.as_secs(), "exec timed out; killing process group");
            kill_process_group(pid);
            let _ = child.wait().await;
            None
        }
    };

    let stdout_bytes = match tokio::time::timeout_at(deadline, &mut stdout_task).await {
        Ok(result) => result.unwrap_or_default(),
        Err(_elapsed) => {
            kill_process_group(pid);
            stdout_task.await.unwrap_or_default()
        }
    };
    let stderr_bytes = match tokio::time::timeout_at(deadline, &mut stderr_task).await {
        Ok(result) => result.unwrap_or_default(),
        Err(_elapsed) => {
            kill_process_group(pid);
            stderr_task.await.unwrap_or_default()
        }
    };

    // Signalled or failed waits report as exit code 1.
    let exit_code = status.and_then(|s| s.code()).unwrap_or(1);

    ExecResult {
        exit_code,
        stdout: epoch.scrubber.scrub(&String::from_utf8_lossy(&stdout_bytes)),
        stderr: epoch.scrubber.scrub(&String::from_utf8_lossy(&stderr_bytes)),
        blocked: false,
        block_reason: None,
    }
}

/// SIGKILL the child's process group (the child is its own group leader).
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}
