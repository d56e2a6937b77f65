// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

use crate::config::{ConfigError, ProvisioningConfig};
use config::{Config, ConfigBuilder, File, FileFormat};
use log::*;
use serde_derive::Deserialize;
use std::{
    env,
    path::{Path, PathBuf},
};

pub static CONFIG_OVERRIDE_ENV_VAR: &str = "SECRET_PROVISIONING_CONFIG";

type Builder = ConfigBuilder<config::builder::DefaultState>;

#[derive(Debug, Default)]
pub struct FileConfigBuilder {
    files: Vec<PathBuf>,
    required: bool,
}

impl FileConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a TOML file as a configuration source. Later files override
    /// earlier ones.
    pub fn file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.files.push(path.into());
        self
    }

    /// Fail instead of skipping when a listed file does not exist
    pub fn required(&mut self, required: bool) -> &mut Self {
        self.required = required;
        self
    }

    /// Compiled defaults overlaid with the configured files
    pub fn builder(&self) -> Result<Builder, ConfigError> {
        self.builder_with_override(env::var(CONFIG_OVERRIDE_ENV_VAR).ok())
    }

    fn builder_with_override(
        &self,
        override_file: Option<String>,
    ) -> Result<Builder, ConfigError> {
        let mut builder =
            Config::builder().add_source(ProvisioningConfig::default());

        // A file set in SECRET_PROVISIONING_CONFIG replaces all others
        if let Some(env_cfg) = override_file.filter(|f| !f.is_empty()) {
            let path = Path::new(&env_cfg);
            if !path.exists() {
                warn!("Configuration set in {CONFIG_OVERRIDE_ENV_VAR} environment variable not found");
                return Err(ConfigError::MissingEnvConfigFile {
                    file: path.display().to_string(),
                });
            }
            warn!(
                "Configuration replaced by {}: {}",
                CONFIG_OVERRIDE_ENV_VAR,
                path.display()
            );
            builder = builder.add_source(
                File::new(&env_cfg, FileFormat::Toml).required(true),
            );
            return Ok(builder);
        }

        for (index, path) in self.files.iter().enumerate() {
            if self.required && !path.exists() {
                return Err(ConfigError::MissingConfigFile {
                    file: path.display().to_string(),
                });
            }
            debug!(
                "Loading configuration from FILE (#{}): {}",
                index,
                path.display()
            );
            builder = builder.add_source(
                File::new(&path.display().to_string(), FileFormat::Toml)
                    .required(self.required),
            );
        }
        Ok(builder)
    }

    pub fn build(&self) -> Result<ProvisioningConfig, ConfigError> {
        deserialize(self.builder()?)
    }
}

/// Deserialize the `[provisioning]` section and validate it
pub(crate) fn deserialize(
    builder: Builder,
) -> Result<ProvisioningConfig, ConfigError> {
    // wrapper struct just to deserialize
    #[derive(Debug, Deserialize)]
    struct FileConfig {
        provisioning: ProvisioningConfig,
    }

    let f: FileConfig = builder.build()?.try_deserialize()?;
    f.provisioning.validate()?;
    debug!("Configuration build process finished.");
    Ok(f.provisioning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let file_path = dir.join(name);
        let mut file = std::fs::File::create(&file_path)
            .expect("failed to create config file");
        writeln!(file, "{contents}").expect("failed to write on config file");
        file_path
    }

    #[test]
    fn test_defaults_without_files() {
        let builder = FileConfigBuilder::new()
            .builder_with_override(None)
            .expect("failed to create builder");
        let config = deserialize(builder).expect("failed to build config");
        assert_eq!(config, ProvisioningConfig::default());
    }

    #[test]
    fn test_load_from_single_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = write_config(
            dir.path(),
            "provisioning.toml",
            "[provisioning]\nlog_secret = true",
        );

        let builder = FileConfigBuilder::new()
            .file(&path)
            .builder_with_override(None)
            .expect("failed to create builder");
        let config = deserialize(builder).expect("failed to build config");
        assert!(config.log_secret);
        assert_eq!(config.report_retries, 1);
    }

    #[test]
    fn test_later_files_override() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let a = write_config(
            dir.path(),
            "a.toml",
            "[provisioning]\nreport_retries = 3",
        );
        let b = write_config(
            dir.path(),
            "b.toml",
            "[provisioning]\nreport_retries = 5",
        );

        let builder = FileConfigBuilder::new()
            .file(&a)
            .file(&b)
            .builder_with_override(None)
            .expect("failed to create builder");
        let config = deserialize(builder).expect("failed to build config");
        assert_eq!(config.report_retries, 5);
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let missing = dir.path().join("nothing.toml");

        // Optional files are skipped
        let builder = FileConfigBuilder::new()
            .file(&missing)
            .builder_with_override(None)
            .expect("failed to create builder");
        assert!(deserialize(builder).is_ok());

        let r = FileConfigBuilder::new()
            .file(&missing)
            .required(true)
            .builder_with_override(None);
        assert!(matches!(r, Err(ConfigError::MissingConfigFile { .. })));

        let r = FileConfigBuilder::new()
            .builder_with_override(Some(missing.display().to_string()));
        assert!(matches!(r, Err(ConfigError::MissingEnvConfigFile { .. })));
    }

    #[test]
    fn test_override_file_replaces_others() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let listed = write_config(
            dir.path(),
            "listed.toml",
            "[provisioning]\nreport_retries = 7",
        );
        let replacement = write_config(
            dir.path(),
            "replacement.toml",
            "[provisioning]\nlog_secret = true",
        );

        let builder = FileConfigBuilder::new()
            .file(&listed)
            .builder_with_override(Some(replacement.display().to_string()))
            .expect("failed to create builder");
        let config = deserialize(builder).expect("failed to build config");
        assert!(config.log_secret);
        assert_eq!(config.report_retries, 1);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = write_config(
            dir.path(),
            "bad.toml",
            "[provisioning]\nreport_retries = 1000",
        );
        let builder = FileConfigBuilder::new()
            .file(&path)
            .builder_with_override(None)
            .expect("failed to create builder");
        assert!(matches!(
            deserialize(builder),
            Err(ConfigError::InvalidOption { .. })
        ));
    }
}
