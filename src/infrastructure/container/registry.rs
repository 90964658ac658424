//! Running container: resolution, singleton cache and shutdown.

use super::component::{
    required_qualifiers, ComponentDefinition, ComponentDescriptor, ErasedInstance, Qualifier,
};
use super::ComponentLifetime;
use crate::errors::{ContainerError, LookupError, ModuleError};
use crate::events::LifecycleListener;
use crate::infrastructure::module::ComponentModule;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// The container handle. Owns every component instance it creates.
pub struct Container {
    id: Uuid,
    definitions: Vec<ComponentDefinition>,
    by_type: HashMap<TypeId, Vec<usize>>,
    /// Singleton slots, keyed by definition index; each is initialized once
    singletons: DashMap<usize, Arc<OnceCell<ErasedInstance>>>,
    creation_order: Mutex<Vec<usize>>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
    modules: Vec<Arc<dyn ComponentModule>>,
    running: AtomicBool,
    stats: InnerStats,
}

#[derive(Default)]
struct InnerStats {
    total_resolutions: AtomicUsize,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
}

/// Snapshot of container counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStats {
    pub components: usize,
    pub singletons_created: usize,
    pub total_resolutions: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

impl ContainerStats {
    pub fn hit_rate(&self) -> f64 {
        if self.total_resolutions == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_resolutions as f64
        }
    }
}

impl Container {
    pub(crate) fn new(
        definitions: Vec<ComponentDefinition>,
        listeners: Vec<Arc<dyn LifecycleListener>>,
        modules: Vec<Arc<dyn ComponentModule>>,
    ) -> Self {
        let mut by_type: HashMap<TypeId, Vec<usize>> = HashMap::new();
        for (index, definition) in definitions.iter().enumerate() {
            by_type
                .entry(definition.descriptor.type_id)
                .or_default()
                .push(index);
        }

        Self {
            id: Uuid::new_v4(),
            definitions,
            by_type,
            singletons: DashMap::new(),
            creation_order: Mutex::new(Vec::new()),
            listeners,
            modules,
            running: AtomicBool::new(true),
            stats: InnerStats::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Resolves exactly one component of type `T` carrying all `qualifiers`.
    pub fn get<T>(&self, qualifiers: &[Qualifier]) -> Result<Arc<T>, LookupError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ResolutionContext::new(self).get::<T>(qualifiers)
    }

    /// Resolves every component of type `T` carrying all `qualifiers`.
    pub fn get_all<T>(&self, qualifiers: &[Qualifier]) -> Result<Vec<Arc<T>>, LookupError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ResolutionContext::new(self).get_all::<T>(qualifiers)
    }

    /// Descriptors of every component matching the lookup, without creating anything.
    pub fn beans<T>(&self, qualifiers: &[Qualifier]) -> Vec<ComponentDescriptor>
    where
        T: ?Sized + 'static,
    {
        self.candidates(TypeId::of::<T>(), qualifiers)
            .into_iter()
            .map(|index| self.definitions[index].descriptor.clone())
            .collect()
    }

    pub fn is_resolvable<T>(&self, qualifiers: &[Qualifier]) -> bool
    where
        T: ?Sized + 'static,
    {
        self.resolve_index(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            qualifiers,
        )
        .is_ok()
    }

    /// Every registered component, in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.definitions.iter().map(|d| &d.descriptor)
    }

    /// Lifecycle listeners, already sorted by priority.
    pub fn listeners(&self) -> &[Arc<dyn LifecycleListener>] {
        &self.listeners
    }

    /// Names of the modules this container was built from, in registration order.
    pub fn modules(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            components: self.definitions.len(),
            singletons_created: self
                .singletons
                .iter()
                .filter(|slot| slot.value().get().is_some())
                .count(),
            total_resolutions: self.stats.total_resolutions.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.stats.cache_misses.load(Ordering::Relaxed),
        }
    }

    /// Disposes created singletons in reverse creation order, then unloads
    /// modules in reverse registration order.
    pub fn shutdown(&self) -> Result<(), ContainerError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(ContainerError::AlreadyShutDown(self.id));
        }

        let order = std::mem::take(&mut *self.creation_order.lock());
        for index in order.into_iter().rev() {
            let Some((_, slot)) = self.singletons.remove(&index) else {
                continue;
            };
            if let Some(instance) = slot.get() {
                let definition = &self.definitions[index];
                tracing::trace!(component = %definition.descriptor.label(), "Disposing component");
                definition.dispose(instance);
            }
        }

        for module in self.modules.iter().rev() {
            module
                .unload()
                .map_err(|source| ModuleError::UnloadFailed {
                    module: module.name().to_string(),
                    source,
                })?;
        }

        tracing::debug!(container = %self.id, "Container shut down");
        Ok(())
    }

    fn candidates(&self, type_id: TypeId, qualifiers: &[Qualifier]) -> Vec<usize> {
        let required = required_qualifiers(qualifiers);
        self.by_type
            .get(&type_id)
            .map(|indexes| {
                indexes
                    .iter()
                    .copied()
                    .filter(|index| self.definitions[*index].descriptor.matches(&required))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn resolve_index(
        &self,
        type_id: TypeId,
        type_name: &'static str,
        qualifiers: &[Qualifier],
    ) -> Result<usize, LookupError> {
        let candidates = self.candidates(type_id, qualifiers);
        match candidates.len() {
            0 => Err(LookupError::Unsatisfied {
                type_name,
                qualifiers: qualifiers.to_vec(),
            }),
            1 => Ok(candidates[0]),
            _ => self
                .disambiguate(&candidates)
                .ok_or_else(|| LookupError::Ambiguous {
                    type_name,
                    qualifiers: qualifiers.to_vec(),
                    candidates: candidates
                        .iter()
                        .map(|index| self.definitions[*index].descriptor.label())
                        .collect(),
                }),
        }
    }

    /// Alternatives beat everything else; the highest-priority alternative wins.
    fn disambiguate(&self, candidates: &[usize]) -> Option<usize> {
        let top = candidates
            .iter()
            .filter_map(|index| self.definitions[*index].descriptor.alternative)
            .max()?;

        let mut winners = candidates
            .iter()
            .copied()
            .filter(|index| self.definitions[*index].descriptor.alternative == Some(top));
        let winner = winners.next()?;
        match winners.next() {
            Some(_) => None,
            None => Some(winner),
        }
    }

    fn instance<T>(&self, index: usize, ctx: &ResolutionContext<'_>) -> Result<Arc<T>, LookupError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.stats.total_resolutions.fetch_add(1, Ordering::Relaxed);
        let definition = &self.definitions[index];

        if definition.descriptor.lifetime == ComponentLifetime::Transient {
            self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
            let _entered = ctx.enter(index)?;
            let created = ctx.create(definition)?;
            return downcast::<T>(&created);
        }

        // Clone the slot out so no shard lock is held while the factory runs.
        let slot = self
            .singletons
            .entry(index)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        if let Some(existing) = slot.get() {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return downcast::<T>(existing);
        }
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);

        // Must precede get_or_try_init: re-entering a cell being initialized
        // on the same thread would block forever.
        let _entered = ctx.enter(index)?;
        let instance = slot.get_or_try_init(|| {
            let created = ctx.create(definition)?;
            self.creation_order.lock().push(index);
            Ok::<_, LookupError>(created)
        })?;
        downcast::<T>(instance)
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if !self.is_running() {
            return;
        }
        if let Err(e) = self.shutdown() {
            tracing::warn!(container = %self.id, error = %e, "Container shutdown on drop failed");
        }
    }
}

fn downcast<T>(instance: &ErasedInstance) -> Result<Arc<T>, LookupError>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(LookupError::TypeCastFailed {
            expected: std::any::type_name::<T>(),
        })
}

thread_local! {
    /// Components under construction on this thread, outermost first.
    static RESOLVING: RefCell<Vec<(Uuid, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Pops its resolution stack entry when the factory returns or unwinds.
struct Entered;

impl Drop for Entered {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Creational context handed to component factories.
///
/// The chain of components under construction is tracked per thread, so a
/// factory cycle surfaces as `CircularDependency` whether it resolves through
/// this context or through `container()`.
pub struct ResolutionContext<'c> {
    container: &'c Container,
}

impl<'c> ResolutionContext<'c> {
    fn new(container: &'c Container) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &'c Container {
        self.container
    }

    pub fn get<T>(&self, qualifiers: &[Qualifier]) -> Result<Arc<T>, LookupError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.ensure_running()?;
        let index = self.container.resolve_index(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            qualifiers,
        )?;
        self.container.instance::<T>(index, self)
    }

    pub fn get_all<T>(&self, qualifiers: &[Qualifier]) -> Result<Vec<Arc<T>>, LookupError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.ensure_running()?;
        self.container
            .candidates(TypeId::of::<T>(), qualifiers)
            .into_iter()
            .map(|index| self.container.instance::<T>(index, self))
            .collect()
    }

    fn ensure_running(&self) -> Result<(), LookupError> {
        if self.container.is_running() {
            Ok(())
        } else {
            Err(LookupError::ContainerShutDown(self.container.id))
        }
    }

    /// Marks `index` as under construction, or reports the cycle it closes.
    fn enter(&self, index: usize) -> Result<Entered, LookupError> {
        let key = (self.container.id, index);
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                let mut chain: Vec<String> = stack
                    .iter()
                    .filter(|(container, _)| *container == self.container.id)
                    .map(|(_, i)| self.container.definitions[*i].descriptor.label())
                    .collect();
                chain.push(self.container.definitions[index].descriptor.label());
                return Err(LookupError::CircularDependency { chain });
            }
            stack.push(key);
            Ok(Entered)
        })
    }

    fn create(&self, definition: &ComponentDefinition) -> Result<ErasedInstance, LookupError> {
        definition.create(self).map_err(|source| match source.downcast::<LookupError>() {
            // Keep cycles visible instead of burying them in CreationFailed.
            Ok(lookup) if matches!(*lookup, LookupError::CircularDependency { .. }) => *lookup,
            Ok(lookup) => LookupError::CreationFailed {
                component: definition.descriptor.label(),
                source: lookup,
            },
            Err(source) => LookupError::CreationFailed {
                component: definition.descriptor.label(),
                source,
            },
        })
    }
}
