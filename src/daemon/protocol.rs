//! Wire types for the daemon's IPC protocol.
//!
//! One UTF-8 JSON object per connection in each direction.  Requests are
//! tagged by an `action` field; responses are plain objects whose shape
//! depends on the action.

use serde::{Deserialize, Serialize};

/// Maximum accepted message size: 10 MiB.
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Default `exec` timeout in seconds.
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 300;

/// A request from a client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Request {
    Ping,
    List,
    Exec {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        /// Seconds; defaults to `DEFAULT_EXEC_TIMEOUT_SECS`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Shutdown,
}

/// Result of one `exec` request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecResult {
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub blocked: bool,
    #[serde(rename = "blockReason", default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl ExecResult {
    /// The canonical shape of a policy rejection.
    pub fn blocked(reason: String) -> Self {
        Self {
            exit_code: 1,
            stdout: String::new(),
            stderr: format!("BLOCKED: {reason}"),
            blocked: true,
            block_reason: Some(reason),
        }
    }
}

/// A response to a client.  Serialized untagged: each action knows the
/// shape it expects back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Ping {
        status: String,
        #[serde(rename = "secretsLoaded")]
        secrets_loaded: usize,
    },
    List {
        secrets: Vec<String>,
    },
    Exec(ExecResult),
    Ack {
        status: String,
    },
    Error {
        error: String,
    },
}
