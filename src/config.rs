use std::path::PathBuf;

use crate::error::{AppError, AppResult};
use crate::shopping::variance::DEFAULT_LOW_STOCK_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub log_filter: String,
    pub log_format: LogFormat,
    pub low_stock_threshold: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("trip_pantry.db"),
            log_filter: "info,trip_pantry_lib=debug".to_string(),
            log_format: LogFormat::Plain,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, falling back to
    /// defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let defaults = Self::default();

        let low_stock_threshold = match lookup("TRIP_PANTRY_LOW_STOCK_THRESHOLD") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                AppError::Config(format!(
                    "TRIP_PANTRY_LOW_STOCK_THRESHOLD must be a number, got {:?}",
                    raw
                ))
            })?,
            None => defaults.low_stock_threshold,
        };

        Ok(Self {
            database_path: lookup("TRIP_PANTRY_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            log_filter: lookup("RUST_LOG").unwrap_or(defaults.log_filter),
            log_format: lookup("LOG_FORMAT")
                .map(|v| if v == "json" { LogFormat::Json } else { LogFormat::Plain })
                .unwrap_or(defaults.log_format),
            low_stock_threshold,
        })
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
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("trip_pantry.db"));
        assert_eq!(config.log_format, LogFormat::Plain);
        assert_eq!(config.low_stock_threshold, 20.0);
    }

    #[test]
    fn env_values_override_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TRIP_PANTRY_DB", "/tmp/pantry.db"),
            ("LOG_FORMAT", "json"),
            ("TRIP_PANTRY_LOW_STOCK_THRESHOLD", "35.5"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/pantry.db"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.low_stock_threshold, 35.5);
    }

    #[test]
    fn invalid_threshold_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("TRIP_PANTRY_LOW_STOCK_THRESHOLD", "lots")]))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
