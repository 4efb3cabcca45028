//! Server configuration.

use std::net::SocketAddr;

use secrecy::SecretString;
use thiserror::Error;

/// Errors raised while reading the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0).
    pub host: String,
    /// Port to listen on (default: 3000).
    pub port: u16,
    /// Bearer key required for mutating requests. Without one the API is
    /// read-only.
    pub api_key: Option<SecretString>,
    /// Deployment environment name (default: production).
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_key: None,
            environment: "production".to_string(),
        }
    }
}

impl ServerConfig {
    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Create config from environment variables.
    ///
    /// Reads:
    /// - `REGISTRY_HOST` (default: 0.0.0.0)
    /// - `REGISTRY_PORT` (default: 3000)
    /// - `REGISTRY_API_KEY` (default: unset, read-only API)
    /// - `REGISTRY_ENVIRONMENT` (default: production)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("REGISTRY_HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("REGISTRY_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::Invalid {
                name: "REGISTRY_PORT",
                reason: format!("'{}' is not a valid port number", port),
            })?;
        }

        if let Ok(key) = std::env::var("REGISTRY_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(SecretString::new(key));
            }
        }

        if let Ok(environment) = std::env::var("REGISTRY_ENVIRONMENT") {
            config.environment = environment;
        }

        Ok(config)
    }

    /// Socket address to bind.
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: "REGISTRY_HOST",
                reason: format!("{}", e),
            })
    }

    /// Whether mutating requests can be authorized at all.
    pub fn is_read_only(&self) -> bool {
        self.api_key.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr().unwrap().to_string(), "0.0.0.0:3000");
        assert!(config.is_read_only());
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_api_key_is_not_printed() {
        let config = ServerConfig::default().with_api_key("s3cr3t");
        assert!(!config.is_read_only());
        assert!(!format!("{:?}", config).contains("s3cr3t"));
    }

    #[test]
    fn test_invalid_host() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(config.addr().is_err());
    }
}
