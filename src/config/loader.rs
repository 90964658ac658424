use super::source::{EnvSource, MapSource, TomlSource};
use super::Config;
use crate::errors::ConfigError;
use std::path::PathBuf;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "UNIMBUS_CONFIG";
/// File looked up in the base directory when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "unimbus.toml";

/// Configuration loader responsible for assembling the default source stack
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
    file: Option<PathBuf>,
    env: Option<EnvSource>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader that reads the process environment and working directory
    pub fn new() -> Self {
        Self {
            base_path: None,
            file: None,
            env: None,
        }
    }

    /// Look for `unimbus.toml` under `base_path` instead of the working directory (for testing)
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Use this file; it must exist
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Replace the process environment snapshot (for testing)
    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = Some(env);
        self
    }

    /// Load defaults, the configuration file if any, and the environment
    pub fn load(self) -> Result<Config, ConfigError> {
        let env = self.env.clone().unwrap_or_else(EnvSource::from_process);
        let mut builder = Config::builder()
            .with_source(MapSource::defaults())
            .with_source(env.clone());

        if let Some(path) = self.locate(&env) {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            builder = builder.with_source(TomlSource::from_path(&path)?);
        }

        Ok(builder.build())
    }

    /// Resolve the configuration file: explicit file, then `UNIMBUS_CONFIG`
    /// (with `~` expansion), then `unimbus.toml` in the base directory if present
    pub fn locate(&self, env: &EnvSource) -> Option<PathBuf> {
        use super::ConfigSource;

        if let Some(file) = &self.file {
            return Some(file.clone());
        }

        if let Some(raw) = env.value(CONFIG_ENV_VAR) {
            let expanded = shellexpand::tilde(&raw);
            return Some(PathBuf::from(expanded.as_ref()));
        }

        let base = self
            .base_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let candidate = base.join(CONFIG_FILE_NAME);
        candidate.exists().then_some(candidate)
    }
}
