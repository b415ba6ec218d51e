//! Runtime configuration: API base URL and API key resolution.
//!
//! The API key is never cached. Every authenticated tool call resolves it
//! again so that a key rotated in the environment takes effect immediately.

/// Base URL of the hosted Bakul API.
pub const DEFAULT_API_BASE: &str = "https://ba.kul.to/api";

/// Primary environment variable holding the API key.
pub const API_KEY_ENV: &str = "BAKUL_API_KEY";

/// Fallback environment variable, consulted only when the primary one is unset or empty.
pub const API_KEY_FALLBACK_ENV: &str = "API_KEY";

/// Environment variables searched for an API key, in priority order.
pub const API_KEY_ENV_VARS: [&str; 2] = [API_KEY_ENV, API_KEY_FALLBACK_ENV];

/// Read-only provider of the bearer credential used for authenticated endpoints.
pub trait ApiKeySource: Send + Sync {
    /// Returns the configured key, or an empty string when none is set.
    fn resolve_api_key(&self) -> String;
}

impl<T: ApiKeySource + ?Sized> ApiKeySource for Box<T> {
    fn resolve_api_key(&self) -> String {
        (**self).resolve_api_key()
    }
}

/// Reads the key from the process environment on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvApiKeySource;

impl ApiKeySource for EnvApiKeySource {
    fn resolve_api_key(&self) -> String {
        resolve_api_key_with(|name| std::env::var(name).ok())
    }
}

/// A key pinned at construction time (`--api-key`, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticApiKeySource(String);

impl StaticApiKeySource {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl ApiKeySource for StaticApiKeySource {
    fn resolve_api_key(&self) -> String {
        self.0.clone()
    }
}

/// First non-empty value among [`API_KEY_ENV_VARS`], else `""`.
pub fn resolve_api_key_with<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// Normalizes a user-supplied base URL so paths can be appended verbatim.
pub fn normalize_api_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| env.get(name).cloned()
    }

    #[test]
    fn primary_variable_wins_over_fallback() {
        let lookup = lookup_from(&[("BAKUL_API_KEY", "x"), ("API_KEY", "y")]);
        assert_eq!(resolve_api_key_with(lookup), "x");
    }

    #[test]
    fn fallback_used_when_primary_missing() {
        let lookup = lookup_from(&[("API_KEY", "y")]);
        assert_eq!(resolve_api_key_with(lookup), "y");
    }

    #[test]
    fn empty_primary_falls_through_to_fallback() {
        let lookup = lookup_from(&[("BAKUL_API_KEY", ""), ("API_KEY", "y")]);
        assert_eq!(resolve_api_key_with(lookup), "y");
    }

    #[test]
    fn neither_variable_set_yields_empty_string() {
        let lookup = lookup_from(&[("UNRELATED", "z")]);
        assert_eq!(resolve_api_key_with(lookup), "");
    }

    #[test]
    fn static_source_returns_pinned_key() {
        let source = StaticApiKeySource::new("sk_test");
        assert_eq!(source.resolve_api_key(), "sk_test");
        assert_eq!(StaticApiKeySource::default().resolve_api_key(), "");
    }

    #[test]
    fn boxed_source_delegates() {
        let source: Box<dyn ApiKeySource> = Box::new(StaticApiKeySource::new("boxed"));
        assert_eq!(source.resolve_api_key(), "boxed");
    }

    #[test]
    fn normalize_api_base_trims_trailing_slashes() {
        assert_eq!(normalize_api_base("https://ba.kul.to/api/"), DEFAULT_API_BASE);
        assert_eq!(normalize_api_base(" http://localhost:3000 "), "http://localhost:3000");
    }
}
