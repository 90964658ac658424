//! Component definitions and qualifiers.
//!
//! A component is registered under the type it is *exposed* as, which may be
//! a trait object (`dyn Greeter`) as well as a concrete type. Factories hand
//! back an `Arc<T>`; the container stores that `Arc` type-erased and clones
//! it out again on lookup.

use super::registry::ResolutionContext;
use super::ComponentLifetime;
use crate::errors::BoxError;
use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Narrows which component satisfies a type-based lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qualifier {
    /// Carried by every component that declares no other selector
    Default,
    /// Carried by every component
    Any,
    /// Carried by components registered with a name
    Named(String),
    /// Free-form marker
    Tag(String),
}

impl Qualifier {
    pub fn named(name: impl Into<String>) -> Self {
        Qualifier::Named(name.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Qualifier::Tag(tag.into())
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Default => write!(f, "@Default"),
            Qualifier::Any => write!(f, "@Any"),
            Qualifier::Named(name) => write!(f, "@Named({:?})", name),
            Qualifier::Tag(tag) => write!(f, "@{}", tag),
        }
    }
}

/// Renders a qualifier list as `[@A, @B]`.
pub fn display_qualifiers(qualifiers: &[Qualifier]) -> String {
    let parts: Vec<String> = qualifiers.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Qualifiers a component effectively carries given what it declared.
pub(crate) fn effective_qualifiers(declared: &[Qualifier]) -> BTreeSet<Qualifier> {
    let mut set: BTreeSet<Qualifier> = declared
        .iter()
        .filter(|q| **q != Qualifier::Any)
        .cloned()
        .collect();
    // Only @Named (or nothing) declared: still a default component.
    if set.iter().all(|q| matches!(q, Qualifier::Named(_))) {
        set.insert(Qualifier::Default);
    }
    set.insert(Qualifier::Any);
    set
}

/// Qualifiers a lookup requires; an empty request means `@Default`.
pub(crate) fn required_qualifiers(requested: &[Qualifier]) -> Vec<Qualifier> {
    if requested.is_empty() {
        vec![Qualifier::Default]
    } else {
        requested.to_vec()
    }
}

/// Index of a component inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) usize);

/// Public, inspectable description of a registered component.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    pub id: ComponentId,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub name: Option<String>,
    pub qualifiers: BTreeSet<Qualifier>,
    pub lifetime: ComponentLifetime,
    pub alternative: Option<i32>,
    pub module: Option<String>,
}

impl ComponentDescriptor {
    /// Whether this component carries every required qualifier.
    pub fn matches(&self, required: &[Qualifier]) -> bool {
        required.iter().all(|q| self.qualifiers.contains(q))
    }

    pub fn is_alternative(&self) -> bool {
        self.alternative.is_some()
    }

    /// Short human label used in logs and errors.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} '{}'", self.type_name, name),
            None => self.type_name.to_string(),
        }
    }
}

pub(crate) type ErasedInstance = Box<dyn Any + Send + Sync>;

type ErasedFactory =
    Box<dyn Fn(&ResolutionContext<'_>) -> Result<ErasedInstance, BoxError> + Send + Sync>;

type ErasedDisposer = Box<dyn Fn(&ErasedInstance) + Send + Sync>;

/// Type-erased component definition held by the container.
pub(crate) struct ComponentDefinition {
    pub(crate) descriptor: ComponentDescriptor,
    pub(crate) factory: ErasedFactory,
    pub(crate) disposer: Option<ErasedDisposer>,
}

impl ComponentDefinition {
    pub(crate) fn create(&self, ctx: &ResolutionContext<'_>) -> Result<ErasedInstance, BoxError> {
        (self.factory)(ctx)
    }

    pub(crate) fn dispose(&self, instance: &ErasedInstance) {
        if let Some(disposer) = &self.disposer {
            disposer(instance);
        }
    }
}

type Factory<T> =
    dyn Fn(&ResolutionContext<'_>) -> Result<Arc<T>, BoxError> + Send + Sync + 'static;

/// Builder for a single component registration.
///
/// ```ignore
/// registrar.add(
///     Component::<dyn Greeter>::new(|_| Ok(Arc::new(English) as Arc<dyn Greeter>))
///         .named("english")
///         .transient(),
/// );
/// ```
pub struct Component<T: ?Sized + Send + Sync + 'static> {
    factory: Box<Factory<T>>,
    name: Option<String>,
    qualifiers: Vec<Qualifier>,
    lifetime: ComponentLifetime,
    alternative: Option<i32>,
    disposer: Option<Box<dyn Fn(&Arc<T>) + Send + Sync>>,
}

impl<T: ?Sized + Send + Sync + 'static> Component<T> {
    /// Component created on demand by `factory`. Singleton unless changed.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            name: None,
            qualifiers: Vec::new(),
            lifetime: ComponentLifetime::Singleton,
            alternative: None,
            disposer: None,
        }
    }

    /// Component backed by an already-built instance.
    pub fn instance(value: Arc<T>) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    /// Names the component and adds the matching `@Named` qualifier.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.qualifiers.push(Qualifier::Named(name.clone()));
        self.name = Some(name);
        self
    }

    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn singleton(mut self) -> Self {
        self.lifetime = ComponentLifetime::Singleton;
        self
    }

    pub fn transient(mut self) -> Self {
        self.lifetime = ComponentLifetime::Transient;
        self
    }

    /// Marks the component as an alternative; higher priority wins ambiguity.
    pub fn alternative(mut self, priority: i32) -> Self {
        self.alternative = Some(priority);
        self
    }

    /// Called for a created singleton when its container shuts down.
    pub fn on_dispose<F>(mut self, disposer: F) -> Self
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        self.disposer = Some(Box::new(disposer));
        self
    }

    pub(crate) fn into_definition(
        self,
        id: ComponentId,
        module: Option<String>,
    ) -> ComponentDefinition {
        let descriptor = ComponentDescriptor {
            id,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: self.name,
            qualifiers: effective_qualifiers(&self.qualifiers),
            lifetime: self.lifetime,
            alternative: self.alternative,
            module,
        };

        let factory = self.factory;
        let erased_factory: ErasedFactory = Box::new(move |ctx| {
            let instance = factory(ctx)?;
            Ok(Box::new(instance) as ErasedInstance)
        });

        let erased_disposer = self.disposer.map(|disposer| {
            Box::new(move |instance: &ErasedInstance| {
                if let Some(instance) = instance.downcast_ref::<Arc<T>>() {
                    disposer(instance);
                }
            }) as ErasedDisposer
        });

        ComponentDefinition {
            descriptor,
            factory: erased_factory,
            disposer: erased_disposer,
        }
    }
}
