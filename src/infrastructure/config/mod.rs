//! Configuration management

use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};

/// Default directory holding uploaded blobs and the history index.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default number of uploads retained per owner.
pub const DEFAULT_MAX_HISTORY: usize = 5;

/// Default upload size limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Optional TOML file merged over the defaults.
pub const CONFIG_FILE: &str = "analytics.toml";

/// Environment prefix, e.g. `ANALYTICS_MAX_HISTORY=10`.
pub const ENV_PREFIX: &str = "ANALYTICS_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub max_history: usize,
    pub max_upload_bytes: u64,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            max_history: DEFAULT_MAX_HISTORY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then `analytics.toml`, then `ANALYTICS_*`.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_history == 0 {
            return Err(AppError::ConfigError(
                "max_history must be at least 1".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(AppError::ConfigError(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(AppError::ConfigError("data_dir cannot be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_figment(defaults()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.max_history, 5);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = defaults().merge(Toml::string(
            r#"
            data_dir = "/var/lib/analytics"
            max_history = 3
            "#,
        ));
        let config = AppConfig::from_figment(figment).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/analytics"));
        assert_eq!(config.max_history, 3);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_zero_history_is_rejected() {
        let figment = defaults().merge(Toml::string("max_history = 0"));
        let err = AppConfig::from_figment(figment).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        let figment = defaults().merge(Toml::string("max_upload_bytes = \"lots\""));
        let err = AppConfig::from_figment(figment).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
