//! Module loaders
//!
//! Loaders are where discovery looks for modules. `ServiceRegistry` is the
//! loader a runtime hands to its container: modules registered on it
//! directly come first, then whatever its delegate provides.

use super::module::ComponentModule;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

pub trait ModuleLoader: Send + Sync {
    fn name(&self) -> &str;

    fn modules(&self) -> Vec<Arc<dyn ComponentModule>>;
}

/// Loader over a fixed module list.
pub struct StaticLoader {
    name: String,
    modules: Vec<Arc<dyn ComponentModule>>,
}

impl StaticLoader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
        }
    }

    pub fn with_module(mut self, module: Arc<dyn ComponentModule>) -> Self {
        self.modules.push(module);
        self
    }
}

impl ModuleLoader for StaticLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn modules(&self) -> Vec<Arc<dyn ComponentModule>> {
        self.modules.clone()
    }
}

/// Registry of modules with an optional parent loader.
pub struct ServiceRegistry {
    registered: RwLock<Vec<Arc<dyn ComponentModule>>>,
    delegate: RwLock<Option<Arc<dyn ModuleLoader>>>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ServiceRegistry {
    pub fn new(delegate: Option<Arc<dyn ModuleLoader>>) -> Self {
        Self {
            registered: RwLock::new(Vec::new()),
            delegate: RwLock::new(delegate),
        }
    }

    pub fn register(&self, module: Arc<dyn ComponentModule>) {
        tracing::debug!(module = module.name(), "Module added to service registry");
        self.registered.write().push(module);
    }

    pub fn set_delegate(&self, delegate: Option<Arc<dyn ModuleLoader>>) {
        *self.delegate.write() = delegate;
    }

    pub fn delegate(&self) -> Option<Arc<dyn ModuleLoader>> {
        self.delegate.read().clone()
    }
}

impl ModuleLoader for ServiceRegistry {
    fn name(&self) -> &str {
        "service-registry"
    }

    fn modules(&self) -> Vec<Arc<dyn ComponentModule>> {
        let mut modules = self.registered.read().clone();
        if let Some(delegate) = self.delegate() {
            modules.extend(delegate.modules());
        }

        let mut seen = HashSet::new();
        modules.retain(|module| seen.insert(module.name().to_string()));
        modules
    }
}
