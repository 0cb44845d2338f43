//! Secret metadata types stored in the vault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a secret is treated in listings.  Storage is encrypted either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Value must be masked in any UI listing.
    Sensitive,
    /// Visible in listings (hostnames, usernames, ...), still encrypted at rest.
    Credential,
}

impl Sensitivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensitive => "sensitive",
            Self::Credential => "credential",
        }
    }

    /// Legacy rows predate the sensitivity column and default to sensitive.
    pub fn from_flag(flag: Option<i64>) -> Self {
        match flag {
            Some(0) => Self::Credential,
            _ => Self::Sensitive,
        }
    }

    pub fn flag(self) -> i64 {
        match self {
            Self::Sensitive => 1,
            Self::Credential => 0,
        }
    }
}

/// Lightweight metadata about a secret (no plaintext, no ciphertext).
///
/// Returned by `VaultStore::list_secrets` so callers can display names
/// and timestamps without touching any secret bytes.
#[derive(Debug, Clone, Serialize)]
pub struct SecretMetadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub sensitivity: Sensitivity,
}

/// Optional attributes accepted by `VaultStore::add_secret`.
#[derive(Debug, Clone, Default)]
pub struct SecretOptions {
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub sensitivity: Option<Sensitivity>,
}

/// Validate that a secret name is a well-formed identifier:
/// `[A-Za-z_][A-Za-z0-9_]*`, ASCII, case-sensitive.
pub fn validate_secret_name(name: &str) -> crate::errors::Result<()> {
    let mut chars = name.bytes();
    let valid_head = chars
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_');
    let valid_tail = name
        .bytes()
        .skip(1)
        .all(|b| b.is_ascii_alphanumeric() || b == b'_');

    if valid_head && valid_tail {
        Ok(())
    } else {
        Err(crate::errors::SecretKeeperError::InvalidSecretName(
            name.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_secret_name("DATABASE_URL").is_ok());
        assert!(validate_secret_name("_private").is_ok());
        assert!(validate_secret_name("key2").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_secret_name("").is_err());
        assert!(validate_secret_name("2key").is_err());
        assert!(validate_secret_name("has-dash").is_err());
        assert!(validate_secret_name("has space").is_err());
        assert!(validate_secret_name("dotted.name").is_err());
    }

    #[test]
    fn legacy_rows_default_to_sensitive() {
        assert_eq!(Sensitivity::from_flag(None), Sensitivity::Sensitive);
        assert_eq!(Sensitivity::from_flag(Some(1)), Sensitivity::Sensitive);
        assert_eq!(Sensitivity::from_flag(Some(0)), Sensitivity::Credential);
    }
}
