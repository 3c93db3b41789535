use std::time::Duration;

use channex_core::shaping::{DEFAULT_AUTO_TRUNCATE_CHARS, ShapingPolicy};

pub const DEFAULT_BASE_URL: &str = "https://staging.channex.io/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_KEY: &str = "CHANNEX_API_KEY";
pub const ENV_BASE_URL: &str = "CHANNEX_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "CHANNEX_TIMEOUT_SECS";
pub const ENV_AUTO_TRUNCATE_CHARS: &str = "CHANNEX_AUTO_TRUNCATE_CHARS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CHANNEX_API_KEY is required")]
    MissingApiKey,
    #[error("invalid upstream base URL '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Connection settings for the upstream channel manager.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let base_url = normalize_base_url(base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                name: ENV_TIMEOUT_SECS,
                value: "0".to_string(),
            });
        }
        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Everything the tool runtime needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub upstream: UpstreamConfig,
    pub shaping: ShapingPolicy,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve from any key/value source so tests never touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = parse_positive(
            ENV_TIMEOUT_SECS,
            lookup(ENV_TIMEOUT_SECS),
            DEFAULT_TIMEOUT_SECS,
        )?;
        let upstream = UpstreamConfig::new(
            lookup(ENV_API_KEY),
            lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()),
            timeout_secs,
        )?;
        let auto_threshold_chars = parse_positive(
            ENV_AUTO_TRUNCATE_CHARS,
            lookup(ENV_AUTO_TRUNCATE_CHARS),
            DEFAULT_AUTO_TRUNCATE_CHARS as u64,
        )? as usize;
        Ok(Self {
            upstream,
            shaping: ShapingPolicy {
                auto_threshold_chars,
            },
        })
    }
}

pub fn parse_positive(
    name: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber { name, value: raw }),
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        value: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: trimmed.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[(ENV_API_KEY, "k")])).unwrap();
        assert_eq!(config.upstream.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.upstream.timeout, Duration::from_secs(30));
        assert_eq!(config.shaping.auto_threshold_chars, 50_000);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = RuntimeConfig::from_lookup(lookup_from(&[(ENV_API_KEY, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = RuntimeConfig::from_lookup(lookup_from(&[
            (ENV_API_KEY, "k"),
            (ENV_BASE_URL, "http://localhost:4000/api/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.upstream.base_url, "http://localhost:4000/api/v1");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = UpstreamConfig::new(Some("k".into()), Some("ftp://example.com".into()), 30)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn numeric_settings_must_be_positive() {
        let err = RuntimeConfig::from_lookup(lookup_from(&[
            (ENV_API_KEY, "k"),
            (ENV_AUTO_TRUNCATE_CHARS, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                name: ENV_AUTO_TRUNCATE_CHARS,
                ..
            }
        ));
        assert_eq!(parse_positive(ENV_TIMEOUT_SECS, Some("15".into()), 30).unwrap(), 15);
        assert!(parse_positive(ENV_TIMEOUT_SECS, Some("abc".into()), 30).is_err());
    }
}
