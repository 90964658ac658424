//! Component modules
//!
//! A module is the unit of discovery: it declares the components and
//! listeners it contributes, the package it lives in, and which other
//! modules must register before it.

use super::container::Registrar;
use crate::errors::{BoxError, ModuleError};
use std::collections::HashMap;
use std::sync::Arc;

/// A bundle of component registrations.
pub trait ComponentModule: Send + Sync {
    /// Unique module name
    fn name(&self) -> &str;

    /// `::`-separated package path, used for package-scoped scans
    fn package(&self) -> &str {
        self.name()
    }

    /// Picked up by loader discovery without an explicit package scan
    fn discoverable(&self) -> bool {
        true
    }

    /// Modules that must register before this one
    fn dependencies(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Contribute components and listeners
    fn register(&self, registrar: &mut Registrar) -> Result<(), BoxError>;

    /// Called when the owning container shuts down
    fn unload(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

type RegisterFn = dyn Fn(&mut Registrar) -> Result<(), BoxError> + Send + Sync;

/// Closure-backed module.
pub struct FnModule {
    name: String,
    package: Option<String>,
    discoverable: bool,
    dependencies: Vec<String>,
    register: Box<RegisterFn>,
}

impl FnModule {
    pub fn new<F>(name: impl Into<String>, register: F) -> Self
    where
        F: Fn(&mut Registrar) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            package: None,
            discoverable: true,
            dependencies: Vec::new(),
            register: Box::new(register),
        }
    }

    pub fn in_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn depends_on(mut self, module: impl Into<String>) -> Self {
        self.dependencies.push(module.into());
        self
    }

    /// Excludes the module from discovery; only package scans find it.
    pub fn hidden(mut self) -> Self {
        self.discoverable = false;
        self
    }
}

impl ComponentModule for FnModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn package(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.name)
    }

    fn discoverable(&self) -> bool {
        self.discoverable
    }

    fn dependencies(&self) -> Vec<&str> {
        self.dependencies.iter().map(String::as_str).collect()
    }

    fn register(&self, registrar: &mut Registrar) -> Result<(), BoxError> {
        (self.register)(registrar)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Orders modules so that every dependency precedes its dependents.
///
/// Modules without ordering constraints keep their registration order.
pub(crate) fn order_modules(
    modules: Vec<Arc<dyn ComponentModule>>,
) -> Result<Vec<Arc<dyn ComponentModule>>, ModuleError> {
    let by_name: HashMap<String, Arc<dyn ComponentModule>> = modules
        .iter()
        .map(|m| (m.name().to_string(), m.clone()))
        .collect();

    let mut marks = HashMap::new();
    let mut path = Vec::new();
    let mut ordered = Vec::with_capacity(modules.len());

    for module in &modules {
        visit(module, &by_name, &mut marks, &mut path, &mut ordered)?;
    }
    Ok(ordered)
}

fn visit(
    module: &Arc<dyn ComponentModule>,
    by_name: &HashMap<String, Arc<dyn ComponentModule>>,
    marks: &mut HashMap<String, Mark>,
    path: &mut Vec<String>,
    ordered: &mut Vec<Arc<dyn ComponentModule>>,
) -> Result<(), ModuleError> {
    let name = module.name().to_string();
    match marks.get(&name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(name);
            return Err(ModuleError::CircularDependency(cycle));
        }
        None => {}
    }

    marks.insert(name.clone(), Mark::Visiting);
    path.push(name.clone());

    for dependency in module.dependencies() {
        let target = by_name
            .get(dependency)
            .ok_or_else(|| ModuleError::DependencyNotFound {
                module: name.clone(),
                dependency: dependency.to_string(),
            })?;
        visit(target, by_name, marks, path, ordered)?;
    }

    path.pop();
    marks.insert(name, Mark::Done);
    ordered.push(module.clone());
    Ok(())
}
