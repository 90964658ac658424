//! Lifecycle events and listeners.

mod emitter;

pub use emitter::EventEmitter;

use crate::errors::BoxError;
use crate::infrastructure::container::Container;
use serde::Serialize;
use std::fmt;

/// Startup phases, in the only order they may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Bootstrap,
    Scan,
    Initialize,
    Deploy,
    BeforeStart,
    Start,
    AfterStart,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 7] = [
        LifecycleEvent::Bootstrap,
        LifecycleEvent::Scan,
        LifecycleEvent::Initialize,
        LifecycleEvent::Deploy,
        LifecycleEvent::BeforeStart,
        LifecycleEvent::Start,
        LifecycleEvent::AfterStart,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LifecycleEvent::Bootstrap => "bootstrap",
            LifecycleEvent::Scan => "scan",
            LifecycleEvent::Initialize => "initialize",
            LifecycleEvent::Deploy => "deploy",
            LifecycleEvent::BeforeStart => "before start",
            LifecycleEvent::Start => "start",
            LifecycleEvent::AfterStart => "after start",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The phase that must fire after this one, if any.
    pub fn next(self) -> Option<LifecycleEvent> {
        Self::ALL.get(self.index() + 1).copied()
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Observer notified of every lifecycle event.
pub trait LifecycleListener: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs first; ties keep registration order
    fn priority(&self) -> i32 {
        0
    }

    fn on_event(&self, event: LifecycleEvent, container: &Container) -> Result<(), BoxError>;
}

type ListenerFn = dyn Fn(LifecycleEvent, &Container) -> Result<(), BoxError> + Send + Sync;

/// Closure-backed listener.
pub struct FnListener {
    name: String,
    priority: i32,
    callback: Box<ListenerFn>,
}

impl FnListener {
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(LifecycleEvent, &Container) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            priority: 0,
            callback: Box::new(callback),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl LifecycleListener for FnListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn on_event(&self, event: LifecycleEvent, container: &Container) -> Result<(), BoxError> {
        (self.callback)(event, container)
    }
}
