//! Container assembly: discovery, module ordering and registration.

use super::component::{Component, ComponentDefinition, ComponentId};
use super::registry::Container;
use crate::errors::{ContainerError, ModuleError};
use crate::events::{EventEmitter, LifecycleListener};
use crate::infrastructure::loader::ModuleLoader;
use crate::infrastructure::module::{order_modules, ComponentModule};
use std::collections::HashSet;
use std::sync::Arc;

/// Registration surface handed to `ComponentModule::register`.
#[derive(Default)]
pub struct Registrar {
    definitions: Vec<ComponentDefinition>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
    current_module: Option<String>,
}

impl Registrar {
    pub fn add<T>(&mut self, component: Component<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let id = ComponentId(self.definitions.len());
        let definition = component.into_definition(id, self.current_module.clone());
        tracing::trace!(
            component = %definition.descriptor.label(),
            module = ?definition.descriptor.module,
            "Component registered"
        );
        self.definitions.push(definition);
        self
    }

    /// Registers an existing value as a singleton.
    pub fn add_instance<T>(&mut self, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.add(Component::instance(Arc::new(value)))
    }

    pub fn add_listener<L>(&mut self, listener: L) -> &mut Self
    where
        L: LifecycleListener + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Number of components registered so far.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Package scope added through `add_packages`.
#[derive(Debug, Clone)]
struct PackageScan {
    package: String,
    recursive: bool,
}

impl PackageScan {
    fn covers(&self, package: &str) -> bool {
        if package == self.package {
            return true;
        }
        self.recursive
            && package
                .strip_prefix(self.package.as_str())
                .is_some_and(|rest| rest.starts_with("::"))
    }
}

/// Collects everything a container is built from.
pub struct ContainerBuilder {
    registrar: Registrar,
    modules: Vec<Arc<dyn ComponentModule>>,
    packages: Vec<PackageScan>,
    loader: Option<Arc<dyn ModuleLoader>>,
    discovery: bool,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            registrar: Registrar::default(),
            modules: Vec::new(),
            packages: Vec::new(),
            loader: None,
            discovery: true,
        }
    }

    pub fn add_component<T>(&mut self, component: Component<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.registrar.add(component);
        self
    }

    pub fn add_instance<T>(&mut self, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.registrar.add_instance(value);
        self
    }

    pub fn add_listener<L>(&mut self, listener: L) -> &mut Self
    where
        L: LifecycleListener + 'static,
    {
        self.registrar.add_listener(listener);
        self
    }

    pub fn add_module(&mut self, module: Arc<dyn ComponentModule>) -> &mut Self {
        self.modules.push(module);
        self
    }

    /// Adds `module` and scans the loader for modules in its package
    /// (and, when `recursive`, in nested packages).
    pub fn add_packages(&mut self, recursive: bool, module: Arc<dyn ComponentModule>) -> &mut Self {
        self.packages.push(PackageScan {
            package: module.package().to_string(),
            recursive,
        });
        self.modules.push(module);
        self
    }

    pub fn set_loader(&mut self, loader: Arc<dyn ModuleLoader>) -> &mut Self {
        self.loader = Some(loader);
        self
    }

    /// Only explicitly added modules and package scans are used.
    pub fn disable_discovery(&mut self) -> &mut Self {
        self.discovery = false;
        self
    }

    /// Discovers and orders modules, lets each register, and builds the container.
    pub fn initialize(self) -> Result<Container, ContainerError> {
        let ContainerBuilder {
            mut registrar,
            modules,
            packages,
            loader,
            discovery,
        } = self;

        let discovered = discover(modules, &packages, loader.as_deref(), discovery);
        let ordered = order_modules(discovered)?;

        for module in &ordered {
            let before = registrar.len();
            registrar.current_module = Some(module.name().to_string());
            module
                .register(&mut registrar)
                .map_err(|source| ModuleError::RegistrationFailed {
                    module: module.name().to_string(),
                    source,
                })?;
            tracing::debug!(
                module = module.name(),
                package = module.package(),
                components = registrar.len() - before,
                "Module registered"
            );
        }
        registrar.current_module = None;

        registrar.add(
            Component::<EventEmitter>::new(|ctx| {
                Ok(Arc::new(EventEmitter::new(ctx.container().listeners().to_vec())))
            })
            .named(EventEmitter::BUILTIN),
        );

        let Registrar {
            definitions,
            mut listeners,
            ..
        } = registrar;
        // Stable: equal priorities keep registration order.
        listeners.sort_by_key(|listener| listener.priority());

        let container = Container::new(definitions, listeners, ordered);
        tracing::debug!(
            container = %container.id(),
            components = container.stats().components,
            modules = container.modules().len(),
            listeners = container.listeners().len(),
            "Container initialized"
        );
        Ok(container)
    }
}

fn discover(
    explicit: Vec<Arc<dyn ComponentModule>>,
    packages: &[PackageScan],
    loader: Option<&dyn ModuleLoader>,
    discovery: bool,
) -> Vec<Arc<dyn ComponentModule>> {
    let mut seen = HashSet::new();
    let mut modules = Vec::new();

    let loaded = loader.map(|l| l.modules()).unwrap_or_default();
    let scanned = loaded.into_iter().filter(|module| {
        (discovery && module.discoverable())
            || packages.iter().any(|scan| scan.covers(module.package()))
    });

    for module in explicit.into_iter().chain(scanned) {
        if seen.insert(module.name().to_string()) {
            modules.push(module);
        }
    }
    modules
}
