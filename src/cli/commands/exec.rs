//! `secret-keeper exec` — run a command through the daemon.
//!
//! The command output comes back already scrubbed; this process never
//! sees a plaintext secret.

use std::io::Write;
use std::time::Duration;

use crate::cli::{output, socket_for_cli, Cli};
use crate::daemon::DaemonClient;
use crate::errors::Result;

/// Execute the `exec` command.  Exits with the child's exit code.
pub fn execute(cli: &Cli, command: &[String], cwd: Option<String>, timeout: Option<u64>) -> Result<()> {
    let command_line = command.join(" ");

    let client = DaemonClient::at(socket_for_cli(cli)?).with_timeout(Duration::from_secs(2));
    let result = client.exec(&command_line, cwd, timeout)?;

    if result.blocked {
        output::error(
            result
                .block_reason
                .as_deref()
                .unwrap_or("command blocked by policy"),
        );
    }

    print!("{}", result.stdout);
    eprint!("{}", result.stderr);
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    if result.exit_code != 0 {
        std::process::exit(result.exit_code);
    }
    Ok(())
}
