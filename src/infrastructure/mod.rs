//! 基础设施层
//!
//! - 组件容器 (component container)
//! - 模块与模块加载 (modules and loaders)

pub mod container;
pub mod loader;
pub mod module;

pub use container::{
    Component, ComponentDescriptor, ComponentLifetime, Container, ContainerBuilder, Qualifier,
    Registrar, ResolutionContext,
};
pub use loader::{ModuleLoader, ServiceRegistry, StaticLoader};
pub use module::{ComponentModule, FnModule};
