//! Gateway configuration types.
//!
//! Values come from the process environment (after `.env` is loaded by
//! `main`). Only `AUTH_ISSUER` is required, and only when real token
//! verification is used.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use scopegate_auth::AuthConfig;

use crate::authz::ScopeDecider;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid configuration {name}={value:?}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Expected token issuer.
    #[serde(default)]
    pub auth_issuer: Option<String>,

    /// JWKS endpoint; derived from the issuer when unset.
    #[serde(default)]
    pub auth_jwks_url: Option<String>,

    /// Expected token audience; not checked when unset.
    #[serde(default)]
    pub auth_audience: Option<String>,

    /// JWKS cache lifetime in seconds.
    #[serde(default = "GatewayConfig::default_jwks_refresh")]
    pub jwks_refresh_seconds: u64,

    /// Contract document to load instead of the embedded one.
    #[serde(default)]
    pub contract_path: Option<PathBuf>,

    /// The one security scheme the decider understands.
    #[serde(default = "GatewayConfig::default_security_scheme")]
    pub security_scheme: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// How long in-flight requests may run after a shutdown signal.
    #[serde(default = "GatewayConfig::default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_jwks_refresh() -> u64 {
        300
    }

    fn default_security_scheme() -> String {
        ScopeDecider::DEFAULT_SCHEME.to_string()
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_shutdown_grace() -> u64 {
        10
    }

    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for unparsable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let auth_issuer = var("AUTH_ISSUER")
            .map(|v| parse_url("AUTH_ISSUER", v))
            .transpose()?;
        let auth_jwks_url = var("AUTH_JWKS_URL")
            .map(|v| parse_url("AUTH_JWKS_URL", v))
            .transpose()?;

        let cors_origins = var("CORS_ORIGINS").map_or(defaults.cors_origins, |v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        Ok(Self {
            listen_addr: var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            auth_issuer,
            auth_jwks_url,
            auth_audience: var("AUTH_AUDIENCE"),
            jwks_refresh_seconds: parse_number(
                "JWKS_REFRESH_SECONDS",
                var("JWKS_REFRESH_SECONDS"),
                defaults.jwks_refresh_seconds,
            )?,
            contract_path: var("CONTRACT_PATH").map(PathBuf::from),
            security_scheme: var("SECURITY_SCHEME").unwrap_or(defaults.security_scheme),
            cors_origins,
            max_body_bytes: parse_number(
                "MAX_BODY_BYTES",
                var("MAX_BODY_BYTES"),
                defaults.max_body_bytes,
            )?,
            request_timeout_seconds: parse_number(
                "REQUEST_TIMEOUT_SECONDS",
                var("REQUEST_TIMEOUT_SECONDS"),
                defaults.request_timeout_seconds,
            )?,
            shutdown_grace_seconds: parse_number(
                "SHUTDOWN_GRACE_SECONDS",
                var("SHUTDOWN_GRACE_SECONDS"),
                defaults.shutdown_grace_seconds,
            )?,
        })
    }

    /// Build the token verification settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no issuer is configured.
    pub fn auth_config(&self) -> Result<AuthConfig, ConfigError> {
        let issuer = self
            .auth_issuer
            .clone()
            .ok_or(ConfigError::Missing("AUTH_ISSUER"))?;

        Ok(AuthConfig {
            jwks_url: self.auth_jwks_url.clone(),
            audience: self.auth_audience.clone(),
            jwks_refresh_seconds: self.jwks_refresh_seconds,
            ..AuthConfig::new(issuer)
        })
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the shutdown grace period as a `Duration`.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            auth_issuer: None,
            auth_jwks_url: None,
            auth_audience: None,
            jwks_refresh_seconds: Self::default_jwks_refresh(),
            contract_path: None,
            security_scheme: Self::default_security_scheme(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            shutdown_grace_seconds: Self::default_shutdown_grace(),
        }
    }
}

fn parse_url(name: &'static str, value: String) -> Result<String, ConfigError> {
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(value),
        Ok(parsed) => Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported URL scheme {:?}", parsed.scheme()),
            value,
        }),
        Err(e) => Err(ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_number<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = value else {
        return Ok(default);
    };

    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        GatewayConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.security_scheme, "BearerAuth");
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert_eq!(config.cors_origins, ["*"]);
        assert!(config.contract_path.is_none());
    }

    #[test]
    fn timeout_duration() {
        let config = GatewayConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(10));
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(config.auth_issuer.is_none());
        assert_eq!(config.jwks_refresh_seconds, 300);
    }

    #[test]
    fn reads_every_variable() {
        let config = from_vars(&[
            ("LISTEN_ADDR", "127.0.0.1:9000"),
            ("AUTH_ISSUER", "https://clerk.example.com"),
            ("AUTH_JWKS_URL", "https://clerk.example.com/keys"),
            ("AUTH_AUDIENCE", "things-api"),
            ("JWKS_REFRESH_SECONDS", "60"),
            ("CONTRACT_PATH", "/etc/scopegate/openapi.json"),
            ("SECURITY_SCHEME", "OAuth2"),
            ("CORS_ORIGINS", "http://localhost:3000, https://app.example.com"),
            ("MAX_BODY_BYTES", "2048"),
            ("REQUEST_TIMEOUT_SECONDS", "5"),
            ("SHUTDOWN_GRACE_SECONDS", "3"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.auth_audience.as_deref(), Some("things-api"));
        assert_eq!(config.jwks_refresh_seconds, 60);
        assert_eq!(
            config.contract_path,
            Some(PathBuf::from("/etc/scopegate/openapi.json"))
        );
        assert_eq!(config.security_scheme, "OAuth2");
        assert_eq!(
            config.cors_origins,
            ["http://localhost:3000", "https://app.example.com"]
        );
        assert_eq!(config.max_body_bytes, 2048);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(3));

        let auth = config.auth_config().unwrap();
        assert_eq!(auth.issuer, "https://clerk.example.com");
        assert_eq!(auth.jwks_url(), "https://clerk.example.com/keys");
        assert_eq!(auth.audience.as_deref(), Some("things-api"));
        assert_eq!(auth.jwks_refresh_seconds, 60);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            from_vars(&[("MAX_BODY_BYTES", "lots")]),
            Err(ConfigError::Invalid { name: "MAX_BODY_BYTES", .. })
        ));
        assert!(matches!(
            from_vars(&[("AUTH_ISSUER", "not a url")]),
            Err(ConfigError::Invalid { name: "AUTH_ISSUER", .. })
        ));
        assert!(matches!(
            from_vars(&[("AUTH_ISSUER", "ftp://clerk.example.com")]),
            Err(ConfigError::Invalid { name: "AUTH_ISSUER", .. })
        ));
    }

    #[test]
    fn auth_config_requires_issuer() {
        let config = from_vars(&[]).unwrap();
        assert!(matches!(
            config.auth_config(),
            Err(ConfigError::Missing("AUTH_ISSUER"))
        ));
    }
}
