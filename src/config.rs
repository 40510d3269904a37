//! Application configuration module
//! Handles environment variable loading, configuration validation, and
//! application settings.

use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingValue(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Mobile-money provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub shortcode: String,
    pub passkey: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub callback_url: String,
    pub request_timeout_secs: u64,
    pub token_safety_margin_secs: u64,
    /// Pending pushes older than this are marked timed out.
    pub push_expiry_secs: u64,
    /// Resolved pushes are evicted from the registry this long after
    /// their outcome was set.
    pub push_retention_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            provider: ProviderConfig::from_env()?,
            logging: LoggingConfig::from_env(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.provider.validate()?;
        Ok(())
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingValue(name.to_string()))
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed_or("SERVER_PORT", 8000)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ProviderConfig {
            base_url: env::var("DARAJA_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
            shortcode: required("DARAJA_SHORTCODE")?,
            passkey: required("DARAJA_PASSKEY")?,
            consumer_key: required("DARAJA_CONSUMER_KEY")?,
            consumer_secret: required("DARAJA_CONSUMER_SECRET")?,
            callback_url: required("DARAJA_CALLBACK_URL")?,
            request_timeout_secs: parsed_or("DARAJA_TIMEOUT_SECS", 12)?,
            token_safety_margin_secs: parsed_or("DARAJA_TOKEN_SAFETY_MARGIN_SECS", 30)?,
            push_expiry_secs: parsed_or("DARAJA_PUSH_EXPIRY_SECS", 300)?,
            push_retention_secs: parsed_or("DARAJA_PUSH_RETENTION_SECS", 3600)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http") {
            return Err(ConfigError::InvalidValue(
                "DARAJA_BASE_URL must be an http(s) URL".to_string(),
            ));
        }
        if !self.callback_url.starts_with("http") {
            return Err(ConfigError::InvalidValue(
                "DARAJA_CALLBACK_URL must be an http(s) URL".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 60 {
            return Err(ConfigError::InvalidValue(
                "DARAJA_TIMEOUT_SECS must be between 1 and 60".to_string(),
            ));
        }
        if !self.shortcode.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue(
                "DARAJA_SHORTCODE must be numeric".to_string(),
            ));
        }
        // A retention shorter than the pending window could evict a push
        // between timing out and its late callback arriving.
        if self.push_retention_secs < self.push_expiry_secs {
            return Err(ConfigError::InvalidValue(
                "DARAJA_PUSH_RETENTION_SECS must be at least DARAJA_PUSH_EXPIRY_SECS".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Plain,
        };
        LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config() -> ProviderConfig {
        ProviderConfig {
            base_url: "https://sandbox.safaricom.co.ke".to_string(),
            shortcode: "174379".to_string(),
            passkey: "passkey".to_string(),
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            callback_url: "https://example.com/webhooks/daraja".to_string(),
            request_timeout_secs: 12,
            token_safety_margin_secs: 30,
            push_expiry_secs: 300,
            push_retention_secs: 3600,
        }
    }

    #[test]
    fn valid_provider_config_passes_validation() {
        assert!(provider_config().validate().is_ok());
    }

    #[test]
    fn non_numeric_shortcode_is_rejected() {
        let mut config = provider_config();
        config.shortcode = "shop-1".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        let mut config = provider_config();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.request_timeout_secs = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn retention_shorter_than_pending_window_is_rejected() {
        let mut config = provider_config();
        config.push_retention_secs = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn server_port_zero_is_rejected() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        assert!(config.validate().is_err());
    }
}
