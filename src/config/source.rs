use crate::errors::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Ordinal of the built-in defaults.
pub const DEFAULTS_ORDINAL: i32 = 0;
/// Ordinal of a TOML file source.
pub const FILE_ORDINAL: i32 = 100;
/// Ordinal of the process environment.
pub const ENV_ORDINAL: i32 = 300;

/// A layer of configuration properties. Higher ordinals win.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn ordinal(&self) -> i32;

    fn value(&self, key: &str) -> Option<String>;

    fn property_names(&self) -> Vec<String>;
}

/// In-memory properties.
#[derive(Debug, Clone)]
pub struct MapSource {
    name: String,
    ordinal: i32,
    values: BTreeMap<String, String>,
}

impl MapSource {
    pub fn new(name: impl Into<String>, ordinal: i32) -> Self {
        Self {
            name: name.into(),
            ordinal,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Built-in defaults for the keys the runtime reads.
    pub fn defaults() -> Self {
        Self::new("defaults", DEFAULTS_ORDINAL)
            .with("unimbus.log.level", "info")
            .with("unimbus.log.format", "compact")
            .with("unimbus.log.target", "true")
    }
}

impl ConfigSource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn property_names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// TOML document flattened to dotted keys.
///
/// `[unimbus.log] level = "debug"` answers `unimbus.log.level`; arrays
/// become comma-separated values.
#[derive(Debug, Clone)]
pub struct TomlSource {
    inner: MapSource,
}

impl TomlSource {
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, ConfigError> {
        let name = name.into();
        let table: toml::Table =
            toml::from_str(text).map_err(|e| ConfigError::TomlParse(name.clone(), e))?;

        let mut inner = MapSource::new(name, FILE_ORDINAL);
        flatten("", &toml::Value::Table(table), &mut inner.values);
        Ok(Self { inner })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead(display.clone(), e))?;
        Self::parse(display, &text)
    }
}

fn flatten(prefix: &str, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    match value {
        toml::Value::Table(table) => {
            for (key, value) in table {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&key, value, out);
            }
        }
        toml::Value::Array(items) => {
            let joined: Vec<String> = items.iter().map(scalar).collect();
            out.insert(prefix.to_string(), joined.join(","));
        }
        other => {
            out.insert(prefix.to_string(), scalar(other));
        }
    }
}

fn scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ConfigSource for TomlSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn ordinal(&self) -> i32 {
        self.inner.ordinal()
    }

    fn value(&self, key: &str) -> Option<String> {
        self.inner.value(key)
    }

    fn property_names(&self) -> Vec<String> {
        self.inner.property_names()
    }
}

/// Snapshot of environment variables.
///
/// A key is looked up as-is, then with every non-alphanumeric character
/// replaced by `_`, then upper-cased: `unimbus.log.level` also matches
/// `UNIMBUS_LOG_LEVEL`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn ordinal(&self) -> i32 {
        ENV_ORDINAL
    }

    fn value(&self, key: &str) -> Option<String> {
        if let Some(value) = self.vars.get(key) {
            return Some(value.clone());
        }
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.vars
            .get(&sanitized)
            .or_else(|| self.vars.get(&sanitized.to_ascii_uppercase()))
            .cloned()
    }

    fn property_names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }
}
