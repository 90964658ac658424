pub mod app;
pub mod args;
pub mod config;
pub mod errors;
pub mod events;
pub mod infrastructure;
pub mod logging;
pub mod messages;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used items for convenience
pub use app::{LifecycleState, RuntimeInfo, Unimbus};
pub use config::{Config, ConfigProvider};
pub use errors::{LookupError, UnimbusError, UnimbusResult};
pub use events::{EventEmitter, FnListener, LifecycleEvent, LifecycleListener};
pub use infrastructure::{
    Component, ComponentLifetime, ComponentModule, Container, ContainerBuilder, FnModule,
    ModuleLoader, Qualifier, Registrar, ResolutionContext, ServiceRegistry, StaticLoader,
};
