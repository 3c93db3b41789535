use channex_mcp_runtime::config::parse_positive;
use channex_mcp_runtime::ConfigError;

pub const DEFAULT_PORT: u16 = 3000;

/// HTTP-only settings. Upstream settings come from `RuntimeConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub production: bool,
    /// `None` allows any origin.
    pub allowed_origins: Option<Vec<String>>,
    /// Raw `API_KEYS` value (`key:user_id:name,...`).
    pub api_keys: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_positive("PORT", lookup("PORT"), u64::from(DEFAULT_PORT))?;
        let port = u16::try_from(port).map_err(|_| ConfigError::InvalidNumber {
            name: "PORT",
            value: port.to_string(),
        })?;
        let production = lookup("APP_ENV")
            .is_some_and(|env| env.trim().eq_ignore_ascii_case("production"));
        let allowed_origins = lookup("ALLOWED_ORIGINS").and_then(|raw| {
            let origins: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty() && *origin != "*")
                .map(str::to_string)
                .collect();
            (!origins.is_empty()).then_some(origins)
        });

        Ok(Self {
            port,
            production,
            allowed_origins,
            api_keys: lookup("API_KEYS").filter(|raw| !raw.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.production);
        assert_eq!(config.allowed_origins, None);
        assert_eq!(config.api_keys, None);
    }

    #[test]
    fn reads_origins_and_production_flag() {
        let config = ServerConfig::from_lookup(|name| match name {
            "APP_ENV" => Some("Production".to_string()),
            "ALLOWED_ORIGINS" => Some("https://a.test, https://b.test,".to_string()),
            "PORT" => Some("8080".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(config.production);
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.allowed_origins,
            Some(vec!["https://a.test".to_string(), "https://b.test".to_string()])
        );
    }

    #[test]
    fn wildcard_origin_means_any() {
        let config = ServerConfig::from_lookup(|name| {
            (name == "ALLOWED_ORIGINS").then(|| "*".to_string())
        })
        .unwrap();
        assert_eq!(config.allowed_origins, None);
    }

    #[test]
    fn port_out_of_range_is_rejected() {
        let err = ServerConfig::from_lookup(|name| (name == "PORT").then(|| "70000".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name: "PORT", .. }));
    }
}
