use crate::app::LifecycleState;
use crate::events::LifecycleEvent;
use crate::infrastructure::container::{display_qualifiers, Qualifier};
use thiserror::Error;

/// Boxed error returned by component factories, module hooks and listeners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type UnimbusResult<T> = Result<T, UnimbusError>;

/// Top-level error for the runtime.
#[derive(Debug, Error)]
pub enum UnimbusError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),
    #[error("Cannot {operation} while {state:?}")]
    IllegalState {
        operation: &'static str,
        state: LifecycleState,
    },
}

/// Component resolution failures.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(
        "Unsatisfied dependency: no component of type {type_name} with qualifiers {}",
        display_qualifiers(.qualifiers)
    )]
    Unsatisfied {
        type_name: &'static str,
        qualifiers: Vec<Qualifier>,
    },
    #[error(
        "Ambiguous dependency: type {type_name} with qualifiers {} matches {}",
        display_qualifiers(.qualifiers),
        .candidates.join(", ")
    )]
    Ambiguous {
        type_name: &'static str,
        qualifiers: Vec<Qualifier>,
        candidates: Vec<String>,
    },
    #[error("Circular dependency detected: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },
    #[error("Failed to create component {component}: {source}")]
    CreationFailed {
        component: String,
        #[source]
        source: BoxError,
    },
    #[error("Type cast failed: expected {expected}")]
    TypeCastFailed { expected: &'static str },
    #[error("Container {0} has been shut down")]
    ContainerShutDown(uuid::Uuid),
}

impl LookupError {
    pub fn is_unsatisfied(&self) -> bool {
        matches!(self, LookupError::Unsatisfied { .. })
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, LookupError::Ambiguous { .. })
    }
}

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module '{module}' depends on unknown module '{dependency}'")]
    DependencyNotFound { module: String, dependency: String },
    #[error("Circular module dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
    #[error("Module '{module}' failed to register: {source}")]
    RegistrationFailed {
        module: String,
        #[source]
        source: BoxError,
    },
    #[error("Module '{module}' failed to unload: {source}")]
    UnloadFailed {
        module: String,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("Container {0} is already shut down")]
    AlreadyShutDown(uuid::Uuid),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Lifecycle event {actual} fired out of order (expected {})", expected_label(.expected))]
    OutOfOrder {
        expected: Option<LifecycleEvent>,
        actual: LifecycleEvent,
    },
    #[error("Listener '{listener}' failed during {phase}: {source}")]
    ListenerFailed {
        phase: LifecycleEvent,
        listener: String,
        #[source]
        source: BoxError,
    },
}

fn expected_label(expected: &Option<LifecycleEvent>) -> &'static str {
    expected.map(|event| event.label()).unwrap_or("none")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Required configuration property '{0}' is missing")]
    Missing(String),
    #[error("Cannot convert '{value}' of property '{key}' to {target}")]
    Conversion {
        key: String,
        value: String,
        target: &'static str,
    },
}
