//! Process configuration
//!
//! Read once from the environment (after `.env` is loaded) and shared as
//! `Arc<Config>`. Nothing mutates it after startup.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_API_KEY: &str = "PROVIDER_API_KEY";
pub const ENV_API_SECRET: &str = "PROVIDER_API_SECRET";
pub const ENV_BASE_URL: &str = "PROVIDER_BASE_URL";
pub const ENV_PATH_PREFIX: &str = "PROVIDER_PATH_PREFIX";
pub const ENV_HEADER_PREFIX: &str = "PROVIDER_HEADER_PREFIX";
pub const ENV_TIMEOUT_SECS: &str = "PROVIDER_TIMEOUT_SECS";
pub const ENV_HOST: &str = "PROXY_HOST";
pub const ENV_PORT: &str = "PROXY_PORT";
pub const ENV_SEARCH_ECHO_PAGE: &str = "PROXY_SEARCH_ECHO_PAGE";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Signing key. Never printed.
#[derive(Clone)]
pub struct ApiSecret(String);

impl ApiSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        ApiSecret(secret.into())
    }

    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Connection details for the payment provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_secret: ApiSecret,
    /// Scheme and host, no trailing slash
    pub base_url: String,
    /// Prepended to every endpoint path; part of the signed path
    pub path_prefix: String,
    /// Prepended to the `API-KEY` / `API-TIMESTAMP` / `API-SIGN` header names
    pub header_prefix: String,
    pub timeout: Duration,
}

/// Inbound HTTP settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Copy the caller's `page` into search responses
    pub search_echo_page: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &'static str| lookup(name).map(|v| v.trim().to_string());

        let api_key = required(ENV_API_KEY)?;
        let api_secret = ApiSecret::new(required(ENV_API_SECRET)?);
        let base_url = required(ENV_BASE_URL)?.trim_end_matches('/').to_string();

        let path_prefix = optional(ENV_PATH_PREFIX)
            .map(|p| normalize_path_prefix(&p))
            .unwrap_or_default();
        let header_prefix = optional(ENV_HEADER_PREFIX).unwrap_or_default();

        let timeout_secs = match optional(ENV_TIMEOUT_SECS).filter(|v| !v.is_empty()) {
            Some(v) => v.parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: ENV_TIMEOUT_SECS,
                value: v.clone(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let host = optional(ENV_HOST)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match optional(ENV_PORT).filter(|v| !v.is_empty()) {
            Some(v) => v.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: ENV_PORT,
                value: v.clone(),
            })?,
            None => DEFAULT_PORT,
        };
        let search_echo_page = match optional(ENV_SEARCH_ECHO_PAGE).filter(|v| !v.is_empty()) {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                name: ENV_SEARCH_ECHO_PAGE,
                value: v,
            })?,
            None => false,
        };

        Ok(Config {
            provider: ProviderConfig {
                api_key,
                api_secret,
                base_url,
                path_prefix,
                header_prefix,
                timeout: Duration::from_secs(timeout_secs),
            },
            server: ServerConfig {
                host,
                port,
                search_echo_page,
            },
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.server.host, self.server.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: ENV_HOST,
            value: raw,
        })
    }
}

/// `api/en/` -> `/api/en`, `/` -> ``
fn normalize_path_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
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

    fn required_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_API_KEY, "key-123"),
            (ENV_API_SECRET, "s3cret"),
            (ENV_BASE_URL, "https://provider.example/"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&required_vars())).unwrap();
        assert_eq!(config.provider.api_key, "key-123");
        assert_eq!(config.provider.base_url, "https://provider.example");
        assert_eq!(config.provider.path_prefix, "");
        assert_eq!(config.provider.header_prefix, "");
        assert_eq!(config.provider.timeout, Duration::from_secs(30));
        assert_eq!(config.server.port, 3000);
        assert!(!config.server.search_echo_page);
        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_missing_required_values() {
        for missing in [ENV_API_KEY, ENV_API_SECRET, ENV_BASE_URL] {
            let vars: Vec<_> = required_vars()
                .into_iter()
                .filter(|(k, _)| *k != missing)
                .collect();
            match Config::from_lookup(lookup_from(&vars)) {
                Err(ConfigError::Missing(name)) => assert_eq!(name, missing),
                other => panic!("expected Missing({}), got {:?}", missing, other),
            }
        }
    }

    #[test]
    fn test_blank_secret_is_missing() {
        let mut vars = required_vars();
        vars[1] = (ENV_API_SECRET, "   ");
        assert!(matches!(
            Config::from_lookup(lookup_from(&vars)),
            Err(ConfigError::Missing(ENV_API_SECRET))
        ));
    }

    #[test]
    fn test_optional_values() {
        let mut vars = required_vars();
        vars.extend([
            (ENV_PATH_PREFIX, "api/en/"),
            (ENV_HEADER_PREFIX, "ACME-"),
            (ENV_TIMEOUT_SECS, "5"),
            (ENV_HOST, "0.0.0.0"),
            (ENV_PORT, "8080"),
            (ENV_SEARCH_ECHO_PAGE, "true"),
        ]);
        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.provider.path_prefix, "/api/en");
        assert_eq!(config.provider.header_prefix, "ACME-");
        assert_eq!(config.provider.timeout, Duration::from_secs(5));
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:8080");
        assert!(config.server.search_echo_page);
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = required_vars();
        vars.push((ENV_PORT, "not-a-port"));
        assert!(matches!(
            Config::from_lookup(lookup_from(&vars)),
            Err(ConfigError::Invalid { name: ENV_PORT, .. })
        ));
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = Config::from_lookup(lookup_from(&required_vars())).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("***"));
    }
}
