//! Rotation provider contract and registry.
//!
//! Providers are a closed set registered in a tag-indexed map at
//! startup; an unknown tag is a fail-fast configuration error, never a
//! silent fallback.

use std::collections::HashMap;

use serde_json::Value;

use crate::errors::{Result, SecretKeeperError};

/// Uniform capability set over heterogeneous rotation back-ends.
pub trait RotationProvider: Send + Sync + std::fmt::Debug {
    /// Stable tag used in rotation configs.
    fn tag(&self) -> &'static str;

    /// Human-readable name for listings.
    fn display_name(&self) -> &'static str;

    /// Produce a new secret value from the provider-specific config and
    /// the current value.  Must not mutate any vault state.
    fn rotate(&self, config: &Value, current_value: &str) -> Result<String>;

    /// Whether the provider-specific config is usable.
    fn validate_config(&self, config: &Value) -> bool;

    /// Dry-run check that a rotation would plausibly succeed.
    fn test_rotate(&self, config: &Value, current_value: &str) -> Result<bool>;
}

/// Tag-indexed provider registry.
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Box<dyn RotationProvider>>,
}

impl ProviderRegistry {
    /// Registry with all built-in providers.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
        };
        registry.register(Box::new(super::custom::CustomProvider));
        registry.register(Box::new(super::openai::OpenAiProvider));
        registry.register(Box::new(super::aws::AwsProvider));
        registry.register(Box::new(super::github::GitHubProvider));
        registry
    }

    pub fn register(&mut self, provider: Box<dyn RotationProvider>) {
        self.providers.insert(provider.tag(), provider);
    }

    /// Look up a provider by tag; unknown tags fail fast.
    pub fn get(&self, tag: &str) -> Result<&dyn RotationProvider> {
        self.providers
            .get(tag)
            .map(|provider| provider.as_ref())
            .ok_or_else(|| SecretKeeperError::UnknownProvider(tag.to_string()))
    }

    /// All registered (tag, display name) pairs, sorted by tag.
    pub fn list(&self) -> Vec<(&'static str, &'static str)> {
        let mut tags: Vec<_> = self
            .providers
            .values()
            .map(|p| (p.tag(), p.display_name()))
            .collect();
        tags.sort();
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_four_providers() {
        let registry = ProviderRegistry::with_builtins();
        let tags: Vec<&str> = registry.list().iter().map(|(t, _)| *t).collect();
        assert_eq!(tags, vec!["aws", "custom", "github", "openai"]);
    }

    #[test]
    fn unknown_tag_fails_fast() {
        let registry = ProviderRegistry::with_builtins();
        let err = registry.get("vault9000").unwrap_err();
        assert!(matches!(err, SecretKeeperError::UnknownProvider(_)));
    }
}
