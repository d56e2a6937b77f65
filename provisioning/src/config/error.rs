// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    // Error from config crate
    #[error("Error from the config crate")]
    Config(#[from] config::ConfigError),

    // Option set to a value outside its accepted range
    #[error("Invalid value '{value}' for configuration option '{option}': {reason}")]
    InvalidOption {
        option: String,
        value: String,
        reason: String,
    },

    // Configuration file given explicitly but not found
    #[error("Missing configuration file {file}")]
    MissingConfigFile { file: String },

    // Missing configuration file set in SECRET_PROVISIONING_CONFIG
    #[error("Missing file {file} set in 'SECRET_PROVISIONING_CONFIG' environment variable")]
    MissingEnvConfigFile { file: String },
}
