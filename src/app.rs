//! Root entry point of the runtime.

use crate::config::{Config, ConfigProvider};
use crate::errors::{UnimbusError, UnimbusResult};
use crate::events::{EventEmitter, LifecycleEvent};
use crate::infrastructure::container::{Component, Container, ContainerBuilder, Qualifier};
use crate::infrastructure::loader::{ModuleLoader, ServiceRegistry};
use crate::infrastructure::module::ComponentModule;
use crate::logging::{self, LoggingConfig, StartupClock, StartupReport};
use crate::messages;
use crate::VERSION;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Phase label for building the container, logged before the lifecycle events.
pub const CONTAINER_INITIALIZE: &str = "container initialize";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Unstarted,
    Starting,
    Running,
    Stopped,
}

/// Registered in every container the runtime starts.
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    pub version: &'static str,
    pub config_module: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Owns the container and drives startup and shutdown.
///
/// ```ignore
/// let mut app = Unimbus::with_config(Some(Arc::new(AppModule)));
/// app.start()?;
/// let greeter = app.get::<dyn Greeter>(&[Qualifier::named("english")])?;
/// app.stop()?;
/// ```
pub struct Unimbus {
    config_module: Option<Arc<dyn ComponentModule>>,
    loader: Option<Arc<dyn ModuleLoader>>,
    registry: Arc<ServiceRegistry>,
    logging: Option<LoggingConfig>,
    state: LifecycleState,
    container: Option<Container>,
    report: Option<StartupReport>,
}

impl Default for Unimbus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Unimbus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unimbus")
            .field("config_module", &self.config_module.as_ref().map(|m| m.name()))
            .field("loader", &self.loader.as_ref().map(|l| l.name()))
            .field("state", &self.state)
            .field("container", &self.container.as_ref().map(|c| c.id()))
            .finish()
    }
}

impl Unimbus {
    /// Create an instance without a configuration module and start it.
    pub fn run() -> UnimbusResult<Self> {
        Self::run_with(None)
    }

    /// Create an instance with the given configuration module and start it.
    pub fn run_with(config_module: Option<Arc<dyn ComponentModule>>) -> UnimbusResult<Self> {
        let mut unimbus = Self::with_config(config_module);
        unimbus.start()?;
        Ok(unimbus)
    }

    pub fn new() -> Self {
        Self {
            config_module: None,
            loader: None,
            registry: Arc::new(ServiceRegistry::default()),
            logging: None,
            state: LifecycleState::Unstarted,
            container: None,
            report: None,
        }
    }

    /// Scans `config_module` and everything the loader chain holds in its package tree.
    pub fn with_config(config_module: Option<Arc<dyn ComponentModule>>) -> Self {
        Self {
            config_module,
            ..Self::new()
        }
    }

    pub fn with_loader(loader: Arc<dyn ModuleLoader>) -> Self {
        let mut unimbus = Self::new();
        unimbus.install_loader(loader);
        unimbus
    }

    /// Overrides the logging settings otherwise read from configuration.
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Replaces the loader delegate. Only allowed before `start()`.
    pub fn set_loader(&mut self, loader: Arc<dyn ModuleLoader>) -> UnimbusResult<()> {
        self.require(LifecycleState::Unstarted, "set loader")?;
        self.install_loader(loader);
        Ok(())
    }

    fn install_loader(&mut self, loader: Arc<dyn ModuleLoader>) {
        self.registry.set_delegate(Some(loader.clone()));
        self.loader = Some(loader);
    }

    /// Builds the container and fires every lifecycle event in order.
    ///
    /// Failures propagate as-is: events already fired are not undone and the
    /// instance stays in `Starting`.
    pub fn start(&mut self) -> UnimbusResult<&mut Self> {
        self.require(LifecycleState::Unstarted, "start")?;
        self.state = LifecycleState::Starting;

        let config = ConfigProvider::get_config()?;
        let logging = match &self.logging {
            Some(logging) => logging.clone(),
            None => LoggingConfig::from_config(&config)?,
        };
        logging::bootstrap(&logging);

        messages::version_info(VERSION);
        messages::starting();
        let mut clock = StartupClock::start();

        let container = self.build_container(config)?;
        let container = self.container.insert(container);
        clock.mark(CONTAINER_INITIALIZE);

        let emitter =
            container.get::<EventEmitter>(&[Qualifier::named(EventEmitter::BUILTIN)])?;
        for event in LifecycleEvent::ALL {
            emitter.fire(event, container)?;
            clock.mark(event.label());
        }

        let report = clock.finish();
        messages::started(report.total);
        self.report = Some(report);
        self.state = LifecycleState::Running;
        Ok(self)
    }

    fn build_container(&self, config: Arc<Config>) -> UnimbusResult<Container> {
        let mut builder = ContainerBuilder::new();
        builder
            .add_instance(RuntimeInfo {
                version: VERSION,
                config_module: self.config_module.as_ref().map(|m| m.name().to_string()),
                started_at: Utc::now(),
            })
            .add_component(Component::instance(self.registry.clone()))
            .add_component(Component::instance(config))
            .set_loader(self.registry.clone());

        if let Some(module) = &self.config_module {
            builder.add_packages(true, module.clone());
        }

        Ok(builder.initialize()?)
    }

    /// Releases the process-wide configuration and shuts the container down.
    pub fn stop(&mut self) -> UnimbusResult<()> {
        self.require(LifecycleState::Running, "stop")?;
        messages::stopping();

        ConfigProvider::release_config();
        self.state = LifecycleState::Stopped;
        if let Some(container) = self.container.take() {
            container.shutdown()?;
        }

        messages::stopped();
        Ok(())
    }

    /// Looks up exactly one component of type `T` carrying all `qualifiers`.
    pub fn get<T>(&self, qualifiers: &[Qualifier]) -> UnimbusResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.require(LifecycleState::Running, "get")?;
        match &self.container {
            Some(container) => Ok(container.get::<T>(qualifiers)?),
            None => Err(UnimbusError::IllegalState {
                operation: "get",
                state: self.state,
            }),
        }
    }

    fn require(&self, expected: LifecycleState, operation: &'static str) -> UnimbusResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(UnimbusError::IllegalState {
                operation,
                state: self.state,
            })
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The running container, if started.
    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    pub fn config_module(&self) -> Option<&Arc<dyn ComponentModule>> {
        self.config_module.as_ref()
    }

    /// The loader delegate, if one was installed.
    pub fn loader(&self) -> Option<&Arc<dyn ModuleLoader>> {
        self.loader.as_ref()
    }

    pub fn service_registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// The loader the container discovers modules through.
    pub fn application_loader(&self) -> Arc<dyn ModuleLoader> {
        self.registry.clone()
    }

    pub fn startup_report(&self) -> Option<&StartupReport> {
        self.report.as_ref()
    }
}
