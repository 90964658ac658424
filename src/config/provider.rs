use super::loader::ConfigLoader;
use super::Config;
use crate::errors::ConfigError;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::sync::Arc;

lazy_static! {
    static ref CURRENT: RwLock<Option<Arc<Config>>> = RwLock::new(None);
}

#[cfg(test)]
lazy_static! {
    /// Serializes unit tests that touch the process-wide configuration.
    pub(crate) static ref TEST_GUARD: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
}

/// Process-wide configuration holder.
pub struct ConfigProvider;

impl ConfigProvider {
    /// The current configuration, loaded with `ConfigLoader::new()` on first use.
    pub fn get_config() -> Result<Arc<Config>, ConfigError> {
        if let Some(config) = CURRENT.read().as_ref() {
            return Ok(config.clone());
        }

        let mut current = CURRENT.write();
        if let Some(config) = current.as_ref() {
            return Ok(config.clone());
        }
        let config = Arc::new(ConfigLoader::new().load()?);
        tracing::debug!(sources = ?config.source_names(), "Configuration loaded");
        *current = Some(config.clone());
        Ok(config)
    }

    /// Installs `config` as the process-wide configuration.
    pub fn set_config(config: Config) -> Arc<Config> {
        let config = Arc::new(config);
        *CURRENT.write() = Some(config.clone());
        config
    }

    /// Drops the process-wide configuration; returns whether one was held.
    pub fn release_config() -> bool {
        CURRENT.write().take().is_some()
    }

    pub fn is_loaded() -> bool {
        CURRENT.read().is_some()
    }
}
