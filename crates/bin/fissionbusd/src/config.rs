//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `fissionbus.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use fissionbus_adapter_rpc::config::BridgeConfig;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RPC bridge settings.
    pub bridge: BridgeConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fissionbusd=info,fissionbus_adapter_rpc=info,fissionbus_app=warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `fissionbus.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("fissionbus.toml")?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("FISSIONBUS_LISTEN") {
            self.bridge.listen = val;
        }
        if let Some(val) = var("FISSIONBUS_REMOTE") {
            self.bridge.remote = Some(val).filter(|url| !url.is_empty());
        }
        if let Some(val) = var("FISSIONBUS_ADVERTISE") {
            self.bridge.advertise = Some(val).filter(|url| !url.is_empty());
        }
        if let Some(val) = var("FISSIONBUS_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bridge listen URL must not be empty".to_string(),
            ));
        }
        if self.bridge.call_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "bridge call timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.bridge.listen, "tcp://127.0.0.1:7633");
        assert!(config.bridge.remote.is_none());
        assert!(config.logging.filter.contains("fissionbusd=info"));
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bridge.call_timeout_ms, 5000);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [bridge]
            listen = 'tcp://:7634'
            remote = 'tcp://localhost:7633'
            advertise = 'tcp://192.168.1.20:7634'
            call_timeout_ms = 1000

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.bridge.listen, "tcp://:7634");
        assert_eq!(config.bridge.remote.as_deref(), Some("tcp://localhost:7633"));
        assert_eq!(
            config.bridge.advertise.as_deref(),
            Some("tcp://192.168.1.20:7634")
        );
        assert_eq!(config.bridge.call_timeout_ms, 1000);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.bridge.listen, "tcp://127.0.0.1:7633");
    }

    #[test]
    fn should_apply_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("FISSIONBUS_LISTEN", "tcp://:7634"),
            ("FISSIONBUS_REMOTE", "tcp://localhost:7633"),
            ("FISSIONBUS_LOG", "debug"),
        ]));
        assert_eq!(config.bridge.listen, "tcp://:7634");
        assert_eq!(config.bridge.remote.as_deref(), Some("tcp://localhost:7633"));
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_prefer_rust_log_over_fissionbus_log() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("FISSIONBUS_LOG", "debug"), ("RUST_LOG", "trace")]));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_clear_remote_with_empty_override() {
        let mut config = Config::default();
        config.bridge.remote = Some("tcp://localhost:7633".to_string());
        config.apply_overrides(env(&[("FISSIONBUS_REMOTE", "")]));
        assert!(config.bridge.remote.is_none());
    }

    #[test]
    fn should_reject_empty_listen_url() {
        let mut config = Config::default();
        config.bridge.listen = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_timeout() {
        let mut config = Config::default();
        config.bridge.call_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
