// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

mod env;
mod error;
mod file_config;

pub use env::*;
pub use error::*;
pub use file_config::*;

use config::{Map, Source, Value};
use log::*;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

/// Section of the TOML file holding these options
pub static CONFIG_SECTION: &str = "provisioning";

pub const DEFAULT_LOG_SECRET: bool = false;
pub const DEFAULT_REPORT_RETRIES: u32 = 1;
pub const MAX_REPORT_RETRIES: u32 = 16;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Log the unwrapped secret, hex encoded. Diagnostics only.
    pub log_secret: bool,
    /// Additional report attempts, each with fresh target info
    pub report_retries: u32,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        ProvisioningConfig {
            log_secret: DEFAULT_LOG_SECRET,
            report_retries: DEFAULT_REPORT_RETRIES,
        }
    }
}

impl ProvisioningConfig {
    /// Load defaults, then `file` (or the file named by
    /// `SECRET_PROVISIONING_CONFIG`), then `SECRET_PROVISIONING_*`
    /// environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut files = FileConfigBuilder::new();
        if let Some(path) = file {
            let _ = files.file(path).required(true);
        }
        let builder = files.builder()?.add_source(EnvConfig::new()?);
        let config = deserialize(builder)?;
        info!(
            "Configuration: log_secret={}, report_retries={}",
            config.log_secret, config.report_retries
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report_retries > MAX_REPORT_RETRIES {
            return Err(ConfigError::InvalidOption {
                option: "report_retries".into(),
                value: self.report_retries.to_string(),
                reason: format!("must be at most {MAX_REPORT_RETRIES}"),
            });
        }
        if self.log_secret {
            warn!("log_secret is enabled: unwrapped secrets will be written to the log");
        }
        Ok(())
    }
}

impl Source for ProvisioningConfig {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
        let options: Map<String, Value> = Map::from([
            ("log_secret".to_string(), Value::from(self.log_secret)),
            (
                "report_retries".to_string(),
                Value::from(i64::from(self.report_retries)),
            ),
        ]);
        Ok(Map::from([(CONFIG_SECTION.to_string(), Value::from(options))]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Config;

    #[test]
    fn test_default_config_as_source() {
        let map = ProvisioningConfig::default()
            .collect()
            .expect("failed to collect defaults");
        assert!(map.contains_key(CONFIG_SECTION));

        #[derive(Deserialize)]
        struct Wrapper {
            provisioning: ProvisioningConfig,
        }
        let w: Wrapper = Config::builder()
            .add_source(ProvisioningConfig::default())
            .build()
            .unwrap() //#[allow_ci]
            .try_deserialize()
            .unwrap(); //#[allow_ci]
        assert!(!w.provisioning.log_secret);
        assert_eq!(w.provisioning.report_retries, DEFAULT_REPORT_RETRIES);
    }

    #[test]
    fn test_validate() {
        let mut config = ProvisioningConfig::default();
        assert!(config.validate().is_ok());
        config.report_retries = MAX_REPORT_RETRIES;
        assert!(config.validate().is_ok());
        config.report_retries = MAX_REPORT_RETRIES + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let r =
            ProvisioningConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(r.is_err());
    }
}
