use std::time::Duration;

use anyhow::{Context, Result};

use crate::generation::IllustrationPolicy;

/// Upper bound on `ILLUSTRATION_RETRIES`.
pub const MAX_ILLUSTRATION_RETRIES: u32 = 10;
use crate::llm_client::DEFAULT_BASE_URL;

/// Application configuration loaded from environment variables.
/// Fails at startup if the API key is missing or a numeric variable does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub genai_base_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Maximum illustration calls in flight.
    pub illustration_concurrency: usize,
    /// Extra attempts per illustration after a failure.
    pub illustration_retries: u32,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")
                .or_else(|_| require_env("API_KEY"))
                .context("Set GEMINI_API_KEY (or API_KEY) to call the generation service")?,
            genai_base_url: std::env::var("GENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            illustration_concurrency: parse_env::<usize>("ILLUSTRATION_CONCURRENCY", 2)
                .context("ILLUSTRATION_CONCURRENCY must be a positive integer")?
                .max(1),
            illustration_retries: parse_env::<u32>("ILLUSTRATION_RETRIES", 1)
                .context("ILLUSTRATION_RETRIES must be a non-negative integer")?
                .min(MAX_ILLUSTRATION_RETRIES),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
        })
    }

    pub fn illustration_policy(&self) -> IllustrationPolicy {
        IllustrationPolicy {
            concurrency: self.illustration_concurrency,
            retries: self.illustration_retries,
            base_backoff: Duration::from_secs(1),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value '{raw}' for '{key}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u16 = parse_env("DREAMWEAVER_TEST_UNSET_VARIABLE", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("DREAMWEAVER_TEST_BAD_NUMBER", "many");
        assert!(parse_env::<usize>("DREAMWEAVER_TEST_BAD_NUMBER", 2).is_err());
        std::env::remove_var("DREAMWEAVER_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_illustration_policy_from_config() {
        let config = Config {
            gemini_api_key: "key".into(),
            genai_base_url: DEFAULT_BASE_URL.into(),
            port: 8080,
            rust_log: "info".into(),
            illustration_concurrency: 3,
            illustration_retries: 2,
            max_upload_bytes: 1024,
        };
        let policy = config.illustration_policy();
        assert_eq!(policy.concurrency, 3);
        assert_eq!(policy.retries, 2);
        assert_eq!(policy.base_backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_illustration_retries_are_clamped() {
        std::env::set_var("GEMINI_API_KEY", "test-key");
        std::env::set_var("ILLUSTRATION_RETRIES", "40");
        let config = Config::from_env().unwrap();
        std::env::remove_var("ILLUSTRATION_RETRIES");
        assert_eq!(config.illustration_retries, MAX_ILLUSTRATION_RETRIES);
    }
}
