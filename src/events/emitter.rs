use super::{LifecycleEvent, LifecycleListener};
use crate::errors::LifecycleError;
use crate::infrastructure::container::Container;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fires lifecycle events to the container's listeners.
///
/// Each event fires at most once and only directly after its predecessor.
pub struct EventEmitter {
    listeners: Vec<Arc<dyn LifecycleListener>>,
    fired: Mutex<Vec<LifecycleEvent>>,
}

impl EventEmitter {
    /// Name of the emitter every container registers for itself.
    pub const BUILTIN: &'static str = "unimbus.event-emitter";

    pub fn new(listeners: Vec<Arc<dyn LifecycleListener>>) -> Self {
        Self {
            listeners,
            fired: Mutex::new(Vec::new()),
        }
    }

    pub fn fire_bootstrap(&self, container: &Container) -> Result<(), LifecycleError> {
        self.fire(LifecycleEvent::Bootstrap, container)
    }

    pub fn fire_scan(&self, container: &Container) -> Result<(), LifecycleError> {
        self.fire(LifecycleEvent::Scan, container)
    }

    pub fn fire_initialize(&self, container: &Container) -> Result<(), LifecycleError> {
        self.fire(LifecycleEvent::Initialize, container)
    }

    pub fn fire_deploy(&self, container: &Container) -> Result<(), LifecycleError> {
        self.fire(LifecycleEvent::Deploy, container)
    }

    pub fn fire_before_start(&self, container: &Container) -> Result<(), LifecycleError> {
        self.fire(LifecycleEvent::BeforeStart, container)
    }

    pub fn fire_start(&self, container: &Container) -> Result<(), LifecycleError> {
        self.fire(LifecycleEvent::Start, container)
    }

    pub fn fire_after_start(&self, container: &Container) -> Result<(), LifecycleError> {
        self.fire(LifecycleEvent::AfterStart, container)
    }

    pub fn fire(&self, event: LifecycleEvent, container: &Container) -> Result<(), LifecycleError> {
        {
            let mut fired = self.fired.lock();
            let expected = match fired.last() {
                None => Some(LifecycleEvent::Bootstrap),
                Some(last) => last.next(),
            };
            if expected != Some(event) {
                return Err(LifecycleError::OutOfOrder {
                    expected,
                    actual: event,
                });
            }
            fired.push(event);
        }

        tracing::debug!(phase = %event, listeners = self.listeners.len(), "Firing lifecycle event");
        for listener in &self.listeners {
            listener
                .on_event(event, container)
                .map_err(|source| LifecycleError::ListenerFailed {
                    phase: event,
                    listener: listener.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Events fired so far, in order.
    pub fn fired(&self) -> Vec<LifecycleEvent> {
        self.fired.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
