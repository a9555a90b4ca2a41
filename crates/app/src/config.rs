//! Process configuration read from the environment.

use thiserror::Error;

use shop_observability::{LogFormat, ParseLogFormatError};

pub const ENV_LOG_FORMAT: &str = "SHOP_LOG_FORMAT";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";
pub const ENV_SEED_DEMO_DATA: &str = "SHOP_SEED_DEMO_DATA";
pub const ENV_MAX_CONFLICT_RETRIES: &str = "SHOP_MAX_CONFLICT_RETRIES";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SHOP_LOG_FORMAT: {0}")]
    LogFormat(#[from] ParseLogFormatError),

    #[error("{key}: expected a boolean, got '{value}'")]
    InvalidBool { key: &'static str, value: String },

    #[error("{key}: expected a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `RUST_LOG`-style filter directives.
    pub log_filter: String,
    pub log_format: LogFormat,
    /// Load the demo members, books and orders at startup.
    pub seed_demo_data: bool,
    /// How many times an operation is redone after an optimistic-concurrency conflict.
    pub max_conflict_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            log_format: LogFormat::Json,
            seed_demo_data: true,
            max_conflict_retries: 3,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(filter) = lookup(ENV_LOG_FILTER).filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            config.log_format = format.parse()?;
        }
        if let Some(value) = lookup(ENV_SEED_DEMO_DATA) {
            config.seed_demo_data = parse_bool(ENV_SEED_DEMO_DATA, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_CONFLICT_RETRIES) {
            config.max_conflict_retries = value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                key: ENV_MAX_CONFLICT_RETRIES,
                value,
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_string(),
        }),
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_environment_yields_defaults() {
        assert_eq!(AppConfig::from_lookup(lookup(&[])).unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_every_key() {
        let config = AppConfig::from_lookup(lookup(&[
            ("RUST_LOG", "shop_app=debug"),
            ("SHOP_LOG_FORMAT", "pretty"),
            ("SHOP_SEED_DEMO_DATA", "off"),
            ("SHOP_MAX_CONFLICT_RETRIES", "7"),
        ]))
        .unwrap();

        assert_eq!(config.log_filter, "shop_app=debug");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.seed_demo_data);
        assert_eq!(config.max_conflict_retries, 7);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("SHOP_MAX_CONFLICT_RETRIES", "-1")])).unwrap_err();
        match err {
            ConfigError::InvalidNumber { key, .. } => assert_eq!(key, ENV_MAX_CONFLICT_RETRIES),
            _ => panic!("Expected InvalidNumber"),
        }

        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("SHOP_SEED_DEMO_DATA", "maybe")])),
            Err(ConfigError::InvalidBool { .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("SHOP_LOG_FORMAT", "xml")])),
            Err(ConfigError::LogFormat(_))
        ));
    }
}
