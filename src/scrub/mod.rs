//! Byte-level output scrubber keyed on the loaded secret values.
//!
//! For every secret value (length >= 3) the scrubber holds three
//! replacement patterns: the raw value (case-insensitive), its
//! URL-percent-encoded form (case-insensitive, only when distinct), and
//! its base64 encoding (case-sensitive).  Patterns are applied in a
//! deterministic order, each one over the output of the previous, so an
//! encoding of one value cannot re-leak through a later replacement.
//!
//! The scrubber never raises; it is rebuilt from scratch whenever the
//! secret map is reloaded.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::{Regex, RegexBuilder};

/// Minimum secret value length considered for scrubbing.  Shorter values
/// produce too many false positives to be useful.
const MIN_VALUE_LEN: usize = 3;

struct ScrubPattern {
    regex: Regex,
    replacement: String,
}

/// A compiled scrubber over one epoch of the secret map.
pub struct Scrubber {
    patterns: Vec<ScrubPattern>,
}

impl Scrubber {
    /// Build a scrubber from the current secret map.
    pub fn new(secrets: &HashMap<String, String>) -> Self {
        // Deterministic order: sort by name so rebuilds are stable.
        let mut names: Vec<&String> = secrets.keys().collect();
        names.sort();

        let mut patterns = Vec::new();
        for name in names {
            let value = &secrets[name];
            if value.len() < MIN_VALUE_LEN {
                continue;
            }

            let marker = format!("[REDACTED:{name}]");

            // 1. Raw value, case-insensitively.
            if let Some(regex) = build_regex(value, true) {
                patterns.push(ScrubPattern {
                    regex,
                    replacement: marker.clone(),
                });
            }

            // 2. URL-percent-encoded form, when it differs from the raw value.
            let encoded = utf8_percent_encode(value, NON_ALPHANUMERIC).to_string();
            if encoded != *value {
                if let Some(regex) = build_regex(&encoded, true) {
                    patterns.push(ScrubPattern {
                        regex,
                        replacement: marker.clone(),
                    });
                }
            }

            // 3. Base64 encoding, case-sensitively (base64 is case-significant).
            let b64 = BASE64.encode(value.as_bytes());
            if let Some(regex) = build_regex(&b64, false) {
                patterns.push(ScrubPattern {
                    regex,
                    replacement: format!("[REDACTED:{name}:base64]"),
                });
            }
        }

        Self { patterns }
    }

    /// Build an empty scrubber (no secrets loaded).
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Replace every secret occurrence in `text` with its marker.
    pub fn scrub(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut out = text.to_string();
        for pattern in &self.patterns {
            out = pattern
                .regex
                .replace_all(&out, pattern.replacement.as_str())
                .into_owned();
        }
        out
    }

    /// Number of compiled patterns (for logging).
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

fn build_regex(literal: &str, case_insensitive: bool) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(literal))
        .case_insensitive(case_insensitive)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrubber(pairs: &[(&str, &str)]) -> Scrubber {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Scrubber::new(&map)
    }

    #[test]
    fn scrubs_raw_values() {
        let s = scrubber(&[("API", "abcdef"), ("DB", "postgres://u:p@h/d")]);
        assert_eq!(
            s.scrub("got key abcdef to access postgres://u:p@h/d today"),
            "got key [REDACTED:API] to access [REDACTED:DB] today"
        );
    }

    #[test]
    fn scrubs_case_insensitively() {
        let s = scrubber(&[("TOKEN", "SeCrEtVal")]);
        assert_eq!(s.scrub("found secretval here"), "found [REDACTED:TOKEN] here");
    }

    #[test]
    fn scrubs_base64_form() {
        let s = scrubber(&[("TOKEN", "hunter2")]);
        // base64("hunter2") == "aHVudGVyMg=="
        assert_eq!(
            s.scrub("X-Auth: aHVudGVyMg=="),
            "X-Auth: [REDACTED:TOKEN:base64]"
        );
    }

    #[test]
    fn scrubs_percent_encoded_form() {
        let s = scrubber(&[("DB", "p@ss w0rd")]);
        let encoded = "p%40ss%20w0rd";
        assert_eq!(
            s.scrub(&format!("uri: {encoded}")),
            "uri: [REDACTED:DB]"
        );
    }

    #[test]
    fn skips_short_values() {
        let s = scrubber(&[("PIN", "42")]);
        assert_eq!(s.pattern_count(), 0);
        assert_eq!(s.scrub("the answer is 42"), "the answer is 42");
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        let s = scrubber(&[("PATTERN", "a.b*c(d)")]);
        assert_eq!(s.scrub("raw a.b*c(d) here"), "raw [REDACTED:PATTERN] here");
        // The unescaped regex would also match this; the literal must not.
        assert_eq!(s.scrub("axbbbc(d)"), "axbbbc(d)");
    }

    #[test]
    fn empty_input_passes_through() {
        let s = scrubber(&[("K", "value")]);
        assert_eq!(s.scrub(""), "");
    }

    #[test]
    fn multiple_occurrences_all_replaced() {
        let s = scrubber(&[("K", "topsecret")]);
        assert_eq!(
            s.scrub("topsecret and topsecret again"),
            "[REDACTED:K] and [REDACTED:K] again"
        );
    }
}
