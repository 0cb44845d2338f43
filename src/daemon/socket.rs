//! Socket topology — shared socket directory, global and per-project
//! socket names, and the project fingerprint.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::vault::paths::vault_db_path;

/// Shared socket directory for every daemon instance.
pub const SOCKET_DIR: &str = "/tmp/secret-keeper";

/// Socket name for the global daemon.
pub const GLOBAL_SOCKET: &str = "sk.sock";

/// Rotation results log, appended by the daemon's scheduler callback.
pub const ROTATION_LOG: &str = "rotation.log";

/// Captured stdout/stderr for a detached daemon.
pub const DAEMON_LOG: &str = "daemon.log";

pub fn socket_dir() -> PathBuf {
    PathBuf::from(SOCKET_DIR)
}

/// Create the socket directory with mode 0700 if it is missing.
pub fn ensure_socket_dir() -> Result<PathBuf> {
    let dir = socket_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    Ok(dir)
}

/// Stable 8-hex-digit fingerprint of a project's absolute path.
///
/// Folds each byte into a 32-bit rolling accumulator
/// (`h := h·31 + byte`), takes the absolute value, and renders
/// lowercase hex padded to width 8.
pub fn project_fingerprint(project: &Path) -> String {
    let mut h: i32 = 0;
    for byte in project.to_string_lossy().as_bytes() {
        h = h.wrapping_mul(31).wrapping_add(i32::from(*byte));
    }
    format!("{:08x}", h.unsigned_abs())
}

/// Socket path for the global daemon.
pub fn global_socket_path() -> PathBuf {
    socket_dir().join(GLOBAL_SOCKET)
}

/// Socket path for a project-scoped daemon.
pub fn project_socket_path(project: &Path) -> PathBuf {
    socket_dir().join(format!("project-{}.sock", project_fingerprint(project)))
}

/// Socket path a client should talk to from `cwd`: the project socket
/// when a local vault exists there, the global socket otherwise.
pub fn resolve_client_socket(cwd: &Path) -> PathBuf {
    if vault_db_path(cwd).exists() {
        project_socket_path(cwd)
    } else {
        global_socket_path()
    }
}

pub fn rotation_log_path() -> PathBuf {
    socket_dir().join(ROTATION_LOG)
}

pub fn daemon_log_path() -> PathBuf {
    socket_dir().join(DAEMON_LOG)
}
