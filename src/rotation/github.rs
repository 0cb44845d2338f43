//! GitHub provider — verification-only.
//!
//! Included for parity: validates the current token against the user
//! endpoint, then directs callers to the custom provider for actual
//! rotation (fine-grained PAT creation has no stable public API).

use std::process::Command;

use serde_json::Value;

use crate::errors::{Result, SecretKeeperError};

use super::provider::RotationProvider;

const USER_ENDPOINT: &str = "https://api.github.com/user";

#[derive(Debug)]
pub struct GitHubProvider;

fn check_token(token: &str) -> Result<bool> {
    let output = Command::new("curl")
        .args([
            "-sf",
            "-o",
            "/dev/null",
            "-H",
            &format!("Authorization: Bearer {token}"),
            "-H",
            "User-Agent: secret-keeper",
            USER_ENDPOINT,
        ])
        .output()
        .map_err(|e| SecretKeeperError::RotationError(format!("reachability check spawn: {e}")))?;

    Ok(output.status.success())
}

impl RotationProvider for GitHubProvider {
    fn tag(&self) -> &'static str {
        "github"
    }

    fn display_name(&self) -> &'static str {
        "GitHub token"
    }

    fn validate_config(&self, config: &Value) -> bool {
        config
            .get("tokenSecret")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    }

    fn rotate(&self, _config: &Value, current_value: &str) -> Result<String> {
        if !check_token(current_value)? {
            return Err(SecretKeeperError::RotationError(
                "current GitHub token failed verification against the user endpoint".into(),
            ));
        }

        Err(SecretKeeperError::RotationError(
            "GitHub token rotation is not automatable here — create a new token and store it, \
             or configure a custom provider"
                .into(),
        ))
    }

    fn test_rotate(&self, _config: &Value, current_value: &str) -> Result<bool> {
        check_token(current_value)
    }
}
