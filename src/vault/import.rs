//! `.env`-style import parsing and name classification.
//!
//! Splits file content into `KEY=VALUE` pairs and decides, per name,
//! whether the entry looks like a credential worth storing or a plain
//! config value the caller may want to skip.

/// Name tokens that mark an entry as sensitive.
const SENSITIVE_TOKENS: &[&str] = &[
    "SECRET",
    "KEY",
    "TOKEN",
    "PASSWORD",
    "PASS",
    "PWD",
    "CREDENTIAL",
    "PRIVATE",
    "AUTH",
    "API_KEY",
    "APIKEY",
    "ACCESS_KEY",
    "ACCESSKEY",
    "CLIENT_SECRET",
];

/// Name tokens that mark an entry as plain configuration.
const CONFIG_TOKENS: &[&str] = &[
    "URL", "HOST", "PORT", "ENDPOINT", "DOMAIN", "REGION", "ZONE", "ENV", "MODE", "DEBUG", "LOG",
    "TIMEOUT", "USERNAME", "USER", "EMAIL", "ID", "PROJECT", "BUCKET", "DATABASE", "DB_NAME",
    "TABLE",
];

/// Outcome of importing one `.env` payload.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Names stored with the sensitive flag.
    pub secrets: Vec<String>,
    /// Names stored as visible credentials.
    pub credentials: Vec<String>,
    /// Names skipped (config-looking, under `secrets_only`).
    pub skipped: Vec<String>,
}

/// A parsed `.env` entry with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub name: String,
    pub value: String,
    pub sensitive: bool,
}

/// Parse a single `.env` line into a (key, value) pair.
///
/// Returns `None` for blank lines, comments, and lines without `=`.
/// Surrounding matching single or double quotes on the value are stripped.
pub fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);

    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    if key.is_empty() {
        return None;
    }

    Some((key, value))
}

/// True if the name contains any sensitive-looking token.
pub fn looks_sensitive(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SENSITIVE_TOKENS.iter().any(|t| upper.contains(t))
}

/// True if the name contains any config-looking token.
pub fn looks_like_config(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    CONFIG_TOKENS.iter().any(|t| upper.contains(t))
}

/// Parse `.env` content and classify every entry.
pub fn parse_env_content(content: &str) -> Vec<ParsedEntry> {
    content
        .lines()
        .filter_map(parse_env_line)
        .map(|(key, value)| ParsedEntry {
            name: key.to_string(),
            value: value.to_string(),
            sensitive: looks_sensitive(key),
        })
        .collect()
}

/// Decide whether an entry should be skipped under `secrets_only`.
pub fn should_skip(entry: &ParsedEntry, secrets_only: bool) -> bool {
    secrets_only && !entry.sensitive && looks_like_config(&entry.name)
}
