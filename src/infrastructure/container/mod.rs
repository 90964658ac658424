//! Component container
//!
//! `ContainerBuilder` collects modules and registrations, `initialize()` turns
//! them into a running `Container` that resolves components by type and
//! qualifier.

pub mod builder;
pub mod component;
pub mod registry;

pub use builder::{ContainerBuilder, Registrar};
pub use component::{display_qualifiers, Component, ComponentDescriptor, ComponentId, Qualifier};
pub use registry::{Container, ContainerStats, ResolutionContext};

/// How long a created instance lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentLifetime {
    /// One instance per container, created on first lookup
    Singleton,
    /// New instance per lookup
    Transient,
}
