//! Custom shell-command rotation provider.
//!
//! Config shape:
//! ```json
//! { "rotateCommand": "gen-new-key.sh", "validateCommand": "check-key.sh" }
//! ```
//!
//! The rotate command runs with `CURRENT_SECRET_VALUE` in its
//! environment and must print the new value on stdout.  The optional
//! validate command runs with `SECRET_VALUE` set to the proposed new
//! value; a non-zero exit aborts the rotation.

use std::process::Command;

use serde_json::Value;

use crate::errors::{Result, SecretKeeperError};

use super::provider::RotationProvider;

#[derive(Debug)]
pub struct CustomProvider;

fn rotate_command(config: &Value) -> Option<&str> {
    config.get("rotateCommand").and_then(Value::as_str)
}

fn validate_command(config: &Value) -> Option<&str> {
    config.get("validateCommand").and_then(Value::as_str)
}

impl RotationProvider for CustomProvider {
    fn tag(&self) -> &'static str {
        "custom"
    }

    fn display_name(&self) -> &'static str {
        "Custom command"
    }

    fn validate_config(&self, config: &Value) -> bool {
        rotate_command(config).is_some_and(|cmd| !cmd.trim().is_empty())
    }

    fn rotate(&self, config: &Value, current_value: &str) -> Result<String> {
        let cmd = rotate_command(config).ok_or_else(|| {
            SecretKeeperError::RotationError("custom provider requires rotateCommand".into())
        })?;

        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .env("CURRENT_SECRET_VALUE", current_value)
            .output()
            .map_err(|e| SecretKeeperError::RotationError(format!("rotate command spawn: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SecretKeeperError::RotationError(format!(
                "rotate command exited with {}: {}",
                output.status.code().unwrap_or(1),
                stderr.trim()
            )));
        }

        let new_value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if new_value.is_empty() {
            return Err(SecretKeeperError::RotationError(
                "rotate command produced no output".into(),
            ));
        }

        if let Some(validate) = validate_command(config) {
            let status = Command::new("sh")
                .arg("-c")
                .arg(validate)
                .env("SECRET_VALUE", &new_value)
                .status()
                .map_err(|e| {
                    SecretKeeperError::RotationError(format!("validate command spawn: {e}"))
                })?;

            if !status.success() {
                return Err(SecretKeeperError::RotationError(format!(
                    "validate command rejected the new value (exit {})",
                    status.code().unwrap_or(1)
                )));
            }
        }

        Ok(new_value)
    }

    fn test_rotate(&self, config: &Value, current_value: &str) -> Result<bool> {
        let cmd = rotate_command(config).ok_or_else(|| {
            SecretKeeperError::RotationError("custom provider requires rotateCommand".into())
        })?;

        let status = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .env("CURRENT_SECRET_VALUE", current_value)
            .env("DRY_RUN", "1")
            .status()
            .map_err(|e| SecretKeeperError::RotationError(format!("rotate command spawn: {e}")))?;

        Ok(status.success())
    }
}
