//! Caller-side daemon client.
//!
//! One-shot connect / send / half-close / receive.  The client resolves
//! the correct socket (project-scoped if a local vault exists at the
//! caller's cwd, else global) and surfaces `DaemonNotRunning` when the
//! socket is absent or the connection is refused.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Result, SecretKeeperError};

use super::protocol::{ExecResult, Request, Response, MAX_MESSAGE_SIZE};
use super::socket;

/// Default connect/read timeout for quick flows like `ping`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    /// Client for the socket a caller at `cwd` should use.
    pub fn for_cwd(cwd: &Path) -> Self {
        Self::at(socket::resolve_client_socket(cwd))
    }

    /// Client for an explicit socket path.
    pub fn at(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Whether a daemon answers on this socket.
    pub fn is_running(&self) -> bool {
        matches!(self.send(&Request::Ping), Ok(Response::Ping { .. }))
    }

    /// Send one request and wait for the complete response.
    pub fn send(&self, request: &Request) -> Result<Response> {
        if !self.socket_path.exists() {
            return Err(SecretKeeperError::DaemonNotRunning);
        }

        let mut stream = UnixStream::connect(&self.socket_path).map_err(|err| {
            if err.kind() == ErrorKind::ConnectionRefused || err.kind() == ErrorKind::NotFound {
                SecretKeeperError::DaemonNotRunning
            } else {
                SecretKeeperError::Io(err)
            }
        })?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let payload = serde_json::to_vec(request)
            .map_err(|e| SecretKeeperError::Protocol(format!("encode request: {e}")))?;
        stream.write_all(&payload)?;
        // Half-close tells the server the request is complete.
        stream.shutdown(std::net::Shutdown::Write)?;

        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = match stream.read(&mut chunk) {
                Ok(n) => n,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Err(SecretKeeperError::Protocol("response timed out".into()));
                }
                Err(err) => return Err(err.into()),
            };
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.len() > MAX_MESSAGE_SIZE {
                return Err(SecretKeeperError::Protocol("response too large".into()));
            }
            // A complete object may arrive before the server closes.
            if serde_json::from_slice::<serde_json::Value>(&buf).is_ok() {
                break;
            }
        }

        if buf.is_empty() {
            return Err(SecretKeeperError::Protocol(
                "server closed the connection without a response".into(),
            ));
        }

        serde_json::from_slice(&buf).map_err(|e| {
            // Partial data on close without a complete object is an error.
            SecretKeeperError::Protocol(format!("incomplete response: {e}"))
        })
    }

    // ------------------------------------------------------------------
    // Typed helpers
    // ------------------------------------------------------------------

    /// `ping` — returns the number of loaded secrets.
    pub fn ping(&self) -> Result<usize> {
        match self.send(&Request::Ping)? {
            Response::Ping { secrets_loaded, .. } => Ok(secrets_loaded),
            Response::Error { error } => Err(SecretKeeperError::Protocol(error)),
            other => Err(unexpected(&other)),
        }
    }

    /// `list` — secret names only, never values.
    pub fn list(&self) -> Result<Vec<String>> {
        match self.send(&Request::List)? {
            Response::List { secrets } => Ok(secrets),
            Response::Error { error } => Err(SecretKeeperError::Protocol(error)),
            other => Err(unexpected(&other)),
        }
    }

    /// `exec` — run a command through the daemon.
    pub fn exec(
        &self,
        command: &str,
        cwd: Option<String>,
        timeout: Option<u64>,
    ) -> Result<ExecResult> {
        let request = Request::Exec {
            command: command.to_string(),
            cwd,
            timeout,
        };
        // Allow the child its full run time, plus slack for the daemon.
        let read_window = Duration::from_secs(timeout.unwrap_or(300).saturating_add(10));
        let client = Self {
            socket_path: self.socket_path.clone(),
            timeout: read_window,
        };
        match client.send(&request)? {
            Response::Exec(result) => Ok(result),
            Response::Error { error } => Err(SecretKeeperError::Protocol(error)),
            other => Err(unexpected(&other)),
        }
    }

    /// `shutdown` — ask the daemon to stop.
    pub fn shutdown(&self) -> Result<()> {
        match self.send(&Request::Shutdown)? {
            Response::Ack { .. } => Ok(()),
            Response::Error { error } => Err(SecretKeeperError::Protocol(error)),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &Response) -> SecretKeeperError {
    SecretKeeperError::Protocol(format!("unexpected response: {response:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_socket_is_daemon_not_running() {
        let dir = TempDir::new().unwrap();
        let client = DaemonClient::at(dir.path().join("absent.sock"));
        let err = client.send(&Request::Ping).unwrap_err();
        assert!(matches!(err, SecretKeeperError::DaemonNotRunning));
        assert!(!client.is_running());
    }

    #[test]
    fn stale_socket_file_is_daemon_not_running() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stale.sock");
        // A bound-then-abandoned socket file refuses connections.
        let _listener = std::os::unix::net::UnixListener::bind(&path).unwrap();
        drop(_listener);

        let client = DaemonClient::at(path);
        let err = client.send(&Request::Ping).unwrap_err();
        assert!(matches!(err, SecretKeeperError::DaemonNotRunning));
    }
}
