//! Layered configuration
//!
//! A `Config` answers property lookups from a stack of sources ordered by
//! ordinal. `ConfigProvider` holds the process-wide instance.

pub mod loader;
pub mod provider;
pub mod source;

pub use loader::{ConfigLoader, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
pub use provider::ConfigProvider;
pub use source::{ConfigSource, EnvSource, MapSource, TomlSource};

use crate::errors::ConfigError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub struct Config {
    /// Sorted by ordinal, highest first
    sources: Vec<Box<dyn ConfigSource>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sources", &self.source_names())
            .finish()
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Raw value from the highest-ordinal source that has it.
    pub fn raw_value(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|source| source.value(key))
    }

    pub fn get_optional_value<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.raw_value(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::Conversion {
                    key: key.to_string(),
                    value: raw.clone(),
                    target: std::any::type_name::<T>(),
                }),
        }
    }

    pub fn get_value<T: FromStr>(&self, key: &str) -> Result<T, ConfigError> {
        self.get_optional_value(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn property_names(&self) -> BTreeSet<String> {
        self.sources
            .iter()
            .flat_map(|source| source.property_names())
            .collect()
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigBuilder {
    pub fn with_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn with_defaults(self) -> Self {
        self.with_source(MapSource::defaults())
    }

    pub fn with_env(self) -> Self {
        self.with_source(EnvSource::from_process())
    }

    pub fn build(mut self) -> Config {
        // Stable sort: equal ordinals keep the order they were added in.
        self.sources.sort_by_key(|source| std::cmp::Reverse(source.ordinal()));
        Config {
            sources: self.sources,
        }
    }
}
