//! Syntactic command policy filter.
//!
//! Rejects commands whose observable purpose is to dump environment
//! state.  The filter is deliberately conservative and never raises; it
//! is defense-in-depth in front of the output scrubber, not a substitute
//! for it.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Commands blocked outright when they appear as the first token.
const BLOCKED_COMMANDS: &[&str] = &[
    "env", "printenv", "export", "set", "xxd", "hexdump", "od", "base64", "history",
];

/// Pattern table: (regex, case_insensitive, reason).
static BLOCKED_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let patterns: &[(&str, bool, &str)] = &[
        (
            r"echo\s+\$\w+",
            true,
            "echoing environment variables is blocked",
        ),
        (
            r"printf\s+.*\$\w+",
            true,
            "printing environment variables is blocked",
        ),
        (
            r"cat\s+/proc/\d+/environ",
            false,
            "reading process environments is blocked",
        ),
        (
            r"\$\w+\s*[|>]",
            false,
            "piping or redirecting variable contents is blocked",
        ),
        (
            r">\s*/dev/tcp/",
            false,
            "network redirection is blocked",
        ),
        (
            r"\b(export|printenv|compgen\s+-e|declare\s+-x)\b",
            false,
            "environment enumeration is blocked",
        ),
    ];

    patterns
        .iter()
        .map(|(pattern, insensitive, reason)| {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(*insensitive)
                .build()
                .expect("policy pattern must compile");
            (regex, *reason)
        })
        .collect()
});

/// The allow/deny outcome for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Blocked(String),
}

impl Decision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

/// Validate a command string against the policy.
pub fn validate(command: &str) -> Decision {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Decision::Allowed;
    }

    // First token, stripped of any leading directory components, so
    // `/usr/bin/env` is treated the same as `env`.
    if let Some(first) = trimmed.split_whitespace().next() {
        let bare = first.rsplit('/').next().unwrap_or(first);
        if BLOCKED_COMMANDS.contains(&bare) {
            return Decision::Blocked(format!("Command '{bare}' is blocked for security"));
        }
    }

    for (regex, reason) in BLOCKED_PATTERNS.iter() {
        if regex.is_match(trimmed) {
            return Decision::Blocked((*reason).to_string());
        }
    }

    Decision::Allowed
}
