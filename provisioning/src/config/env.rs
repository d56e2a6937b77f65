// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

use crate::config::{ConfigError, CONFIG_SECTION};
use config::{Environment, Map, Source, Value};
use log::*;

pub static ENV_PREFIX: &str = "SECRET_PROVISIONING";

/// Configuration overrides taken from `SECRET_PROVISIONING_*` variables
#[derive(Clone, Debug)]
pub struct EnvConfig {
    map: Map<String, Value>,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(".")
        .prefix_separator("_")
}

impl EnvConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_environment(environment())
    }

    /// Build from an explicit set of variables instead of the process
    /// environment
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Map<String, String>>();
        Self::from_environment(environment().source(Some(source)))
    }

    fn from_environment(env_source: Environment) -> Result<Self, ConfigError> {
        let collected = env_source.collect()?;
        collected
            .iter()
            .for_each(|(c, v)| debug!("Environment configuration {c}={v}"));

        // Nest under the section so it overlays the file configuration
        Ok(EnvConfig {
            map: Map::from([(
                CONFIG_SECTION.to_string(),
                Value::from(collected),
            )]),
        })
    }
}

impl Source for EnvConfig {
    fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
        Ok(self.map.clone())
    }

    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }
}
