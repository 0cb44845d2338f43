//! AWS access-key rotation through the platform CLI.
//!
//! Config shape:
//! ```json
//! { "accessKeyIdSecret": "AWS_ACCESS_KEY_ID", "secretAccessKeySecret": "AWS_SECRET_ACCESS_KEY" }
//! ```
//!
//! Flow: verify the current pair and extract the IAM user from the
//! caller-identity ARN, create a new key pair, wait out IAM propagation,
//! verify the new pair, then delete the old key.  If the new pair fails
//! verification it is deleted and the rotation fails with the old pair
//! intact.  The returned value is the serialized new pair.

use std::process::Command;
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use crate::errors::{Result, SecretKeeperError};

use super::provider::RotationProvider;

/// IAM key propagation wait before verifying the new pair.
const PROPAGATION_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct AwsProvider;

fn rotation_error(context: &str, detail: impl std::fmt::Display) -> SecretKeeperError {
    SecretKeeperError::RotationError(format!("{context}: {detail}"))
}

/// Run the AWS CLI with an explicit credential pair and parse its JSON output.
fn aws_json(args: &[&str], key_id: &str, secret_key: &str) -> Result<Value> {
    let output = Command::new("aws")
        .args(args)
        .arg("--output")
        .arg("json")
        .env("AWS_ACCESS_KEY_ID", key_id)
        .env("AWS_SECRET_ACCESS_KEY", secret_key)
        .env_remove("AWS_SESSION_TOKEN")
        .output()
        .map_err(|e| rotation_error("aws cli spawn", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(rotation_error("aws cli", stderr.trim()));
    }

    if output.stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&output.stdout).map_err(|e| rotation_error("aws cli output", e))
}

/// Extract the IAM user name from a caller-identity ARN like
/// `arn:aws:iam::123456789012:user/alice`.
fn user_from_arn(arn: &str) -> Option<&str> {
    arn.rsplit_once("user/").map(|(_, user)| user)
}

/// Parse the stored pair out of the current secret value.
///
/// Accepts either the serialized pair this provider writes, or a bare
/// access-key-id (in which case the secret key must come from config at
/// first setup — rejected here).
fn parse_pair(current_value: &str) -> Result<(String, String)> {
    let parsed: Value = serde_json::from_str(current_value).map_err(|_| {
        SecretKeeperError::RotationError(
            "current value is not a serialized key pair — expected \
             {\"accessKeyId\": ..., \"secretAccessKey\": ...}"
                .into(),
        )
    })?;

    let key_id = parsed.get("accessKeyId").and_then(Value::as_str);
    let secret = parsed.get("secretAccessKey").and_then(Value::as_str);
    match (key_id, secret) {
        (Some(k), Some(s)) => Ok((k.to_string(), s.to_string())),
        _ => Err(SecretKeeperError::RotationError(
            "serialized pair is missing accessKeyId or secretAccessKey".into(),
        )),
    }
}

impl RotationProvider for AwsProvider {
    fn tag(&self) -> &'static str {
        "aws"
    }

    fn display_name(&self) -> &'static str {
        "AWS access key pair"
    }

    fn validate_config(&self, config: &Value) -> bool {
        let has = |field: &str| {
            config
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty())
        };
        has("accessKeyIdSecret") && has("secretAccessKeySecret")
    }

    fn rotate(&self, _config: &Value, current_value: &str) -> Result<String> {
        let (old_id, old_secret) = parse_pair(current_value)?;

        // 1. Verify current credentials and learn the IAM user name.
        let identity = aws_json(&["sts", "get-caller-identity"], &old_id, &old_secret)?;
        let arn = identity
            .get("Arn")
            .and_then(Value::as_str)
            .ok_or_else(|| rotation_error("caller identity", "response has no Arn"))?;
        let user = user_from_arn(arn)
            .ok_or_else(|| rotation_error("caller identity", format!("not an IAM user: {arn}")))?
            .to_string();

        // 2. Create the replacement pair.
        let created = aws_json(
            &["iam", "create-access-key", "--user-name", &user],
            &old_id,
            &old_secret,
        )?;
        let new_id = created
            .pointer("/AccessKey/AccessKeyId")
            .and_then(Value::as_str)
            .ok_or_else(|| rotation_error("create-access-key", "no AccessKeyId in response"))?
            .to_string();
        let new_secret = created
            .pointer("/AccessKey/SecretAccessKey")
            .and_then(Value::as_str)
            .ok_or_else(|| rotation_error("create-access-key", "no SecretAccessKey in response"))?
            .to_string();

        // 3. IAM is eventually consistent; give the new key time to land.
        thread::sleep(PROPAGATION_WAIT);

        // 4. Verify the new pair.  On failure, delete it and keep the old.
        if let Err(verify_err) = aws_json(&["sts", "get-caller-identity"], &new_id, &new_secret) {
            let _ = aws_json(
                &[
                    "iam",
                    "delete-access-key",
                    "--user-name",
                    &user,
                    "--access-key-id",
                    &new_id,
                ],
                &old_id,
                &old_secret,
            );
            return Err(rotation_error("new key failed verification", verify_err));
        }

        // 5. Retire the old key using the new credentials.
        aws_json(
            &[
                "iam",
                "delete-access-key",
                "--user-name",
                &user,
                "--access-key-id",
                &old_id,
            ],
            &new_id,
            &new_secret,
        )?;

        Ok(json!({
            "accessKeyId": new_id,
            "secretAccessKey": new_secret,
        })
        .to_string())
    }

    fn test_rotate(&self, _config: &Value, current_value: &str) -> Result<bool> {
        let (key_id, secret) = parse_pair(current_value)?;
        Ok(aws_json(&["sts", "get-caller-identity"], &key_id, &secret).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_config_needs_both_secret_names() {
        let p = AwsProvider;
        assert!(p.validate_config(&json!({
            "accessKeyIdSecret": "AWS_ACCESS_KEY_ID",
            "secretAccessKeySecret": "AWS_SECRET_ACCESS_KEY",
        })));
        assert!(!p.validate_config(&json!({"accessKeyIdSecret": "AWS_ACCESS_KEY_ID"})));
    }

    #[test]
    fn user_name_is_extracted_from_arn() {
        assert_eq!(
            user_from_arn("arn:aws:iam::123456789012:user/alice"),
            Some("alice")
        );
        assert_eq!(
            user_from_arn("arn:aws:iam::123456789012:user/team/bob"),
            Some("team/bob")
        );
        assert_eq!(user_from_arn("arn:aws:sts::1:assumed-role/x"), None);
    }

    #[test]
    fn pair_parsing_rejects_bare_strings() {
        assert!(parse_pair("AKIAFOO").is_err());
        let pair = parse_pair(r#"{"accessKeyId":"AKIA1","secretAccessKey":"s3cr3t"}"#).unwrap();
        assert_eq!(pair.0, "AKIA1");
        assert_eq!(pair.1, "s3cr3t");
    }
}
