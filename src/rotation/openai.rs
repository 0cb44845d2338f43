//! OpenAI provider — verification-only.
//!
//! The upstream API exposes no programmatic key creation, so `rotate`
//! verifies the current key against the models endpoint and then fails
//! with a directive to rotate manually (or via the custom provider).

use std::process::Command;

use serde_json::Value;

use crate::errors::{Result, SecretKeeperError};

use super::provider::RotationProvider;

const MODELS_ENDPOINT: &str = "https://api.openai.com/v1/models";

#[derive(Debug)]
pub struct OpenAiProvider;

fn check_key(api_key: &str) -> Result<bool> {
    let output = Command::new("curl")
        .args([
            "-sf",
            "-o",
            "/dev/null",
            "-H",
            &format!("Authorization: Bearer {api_key}"),
            MODELS_ENDPOINT,
        ])
        .output()
        .map_err(|e| SecretKeeperError::RotationError(format!("reachability check spawn: {e}")))?;

    Ok(output.status.success())
}

impl RotationProvider for OpenAiProvider {
    fn tag(&self) -> &'static str {
        "openai"
    }

    fn display_name(&self) -> &'static str {
        "OpenAI API key"
    }

    fn validate_config(&self, config: &Value) -> bool {
        config
            .get("apiKeySecret")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    }

    fn rotate(&self, _config: &Value, current_value: &str) -> Result<String> {
        if !check_key(current_value)? {
            return Err(SecretKeeperError::RotationError(
                "current OpenAI key failed verification against the models endpoint".into(),
            ));
        }

        Err(SecretKeeperError::RotationError(
            "OpenAI does not expose programmatic key creation — generate a new key in the \
             dashboard and store it, or configure a custom provider"
                .into(),
        ))
    }

    fn test_rotate(&self, _config: &Value, current_value: &str) -> Result<bool> {
        check_key(current_value)
    }
}
