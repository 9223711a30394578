use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;
use crate::gateway::gemini::{
    GeminiConfig, DEFAULT_API_BASE, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    DEFAULT_TIMEOUT,
};
use crate::gateway::prompt::DEFAULT_MAX_PROMPT_TOKENS;
use crate::interceptor::bounder::DEFAULT_MAX_WORDS;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Process configuration, read once at startup and never mutated.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub bind: SocketAddr,
    pub max_words: usize,
    pub max_prompt_tokens: usize,
    pub max_output_tokens: u32,
    pub timeout: Duration,
    pub policy_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; tests pass a map instead of
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::Missing(API_KEY_VAR))?;

        Ok(Self {
            api_key,
            api_base: get("ERRORFIX_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: get("ERRORFIX_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            bind: parse_or(
                get("ERRORFIX_BIND"),
                "ERRORFIX_BIND",
                SocketAddr::from(([127, 0, 0, 1], 3000)),
            )?,
            max_words: parse_or(
                get("ERRORFIX_MAX_WORDS"),
                "ERRORFIX_MAX_WORDS",
                DEFAULT_MAX_WORDS,
            )?,
            max_prompt_tokens: parse_or(
                get("ERRORFIX_MAX_PROMPT_TOKENS"),
                "ERRORFIX_MAX_PROMPT_TOKENS",
                DEFAULT_MAX_PROMPT_TOKENS,
            )?,
            max_output_tokens: parse_or(
                get("ERRORFIX_MAX_OUTPUT_TOKENS"),
                "ERRORFIX_MAX_OUTPUT_TOKENS",
                DEFAULT_MAX_OUTPUT_TOKENS,
            )?,
            timeout: Duration::from_secs(parse_or(
                get("ERRORFIX_TIMEOUT_SECS"),
                "ERRORFIX_TIMEOUT_SECS",
                DEFAULT_TIMEOUT.as_secs(),
            )?),
            policy_path: get("ERRORFIX_POLICY_PATH").map(PathBuf::from),
        })
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            max_output_tokens: self.max_output_tokens,
            temperature: DEFAULT_TEMPERATURE,
            timeout: self.timeout,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("bind", &self.bind)
            .field("max_words", &self.max_words)
            .field("max_prompt_tokens", &self.max_prompt_tokens)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout", &self.timeout)
            .field("policy_path", &self.policy_path)
            .finish()
    }
}

fn parse_or<T: FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let settings = Settings::from_lookup(lookup(&[(API_KEY_VAR, "abc")])).unwrap();
        assert_eq!(settings.api_key, "abc");
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert_eq!(settings.max_words, 9000);
        assert_eq!(settings.max_prompt_tokens, 3000);
        assert_eq!(settings.max_output_tokens, 2048);
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.bind.port(), 3000);
        assert!(settings.policy_path.is_none());
    }

    #[test]
    fn missing_or_blank_key_is_an_error() {
        assert!(matches!(
            Settings::from_lookup(lookup(&[])),
            Err(ConfigError::Missing(API_KEY_VAR))
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[(API_KEY_VAR, "   ")])),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            (API_KEY_VAR, "abc"),
            ("ERRORFIX_MODEL", "gemini-2.0-pro"),
            ("ERRORFIX_BIND", "0.0.0.0:8080"),
            ("ERRORFIX_MAX_WORDS", "500"),
            ("ERRORFIX_TIMEOUT_SECS", "5"),
            ("ERRORFIX_POLICY_PATH", "/etc/errorfix/policy.json"),
        ]))
        .unwrap();
        assert_eq!(settings.model, "gemini-2.0-pro");
        assert_eq!(settings.bind.port(), 8080);
        assert_eq!(settings.max_words, 500);
        assert_eq!(settings.gemini_config().timeout, Duration::from_secs(5));
        assert_eq!(
            settings.policy_path.as_deref(),
            Some(std::path::Path::new("/etc/errorfix/policy.json"))
        );
    }

    #[test]
    fn malformed_number_names_the_variable() {
        let err = Settings::from_lookup(lookup(&[
            (API_KEY_VAR, "abc"),
            ("ERRORFIX_MAX_WORDS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ERRORFIX_MAX_WORDS", .. }));
    }

    #[test]
    fn debug_redacts_api_key() {
        let settings = Settings::from_lookup(lookup(&[(API_KEY_VAR, "super-secret")])).unwrap();
        assert!(!format!("{settings:?}").contains("super-secret"));
    }
}
