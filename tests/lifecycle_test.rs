//! 生命周期编排的集成测试

use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use unimbus::config::{Config, ConfigProvider, MapSource};
use unimbus::errors::{BoxError, LookupError};
use unimbus::logging::LoggingConfig;
use unimbus::{
    Component, ComponentModule, FnListener, FnModule, LifecycleEvent, LifecycleState, ModuleLoader,
    Qualifier, Registrar, RuntimeInfo, StaticLoader, Unimbus, UnimbusError,
};

lazy_static! {
    /// Every test here shares the process-wide configuration.
    static ref SERIAL: Mutex<()> = Mutex::new(());
}

trait Store: Send + Sync {
    fn kind(&self) -> &'static str;
}

struct Memory;

impl Store for Memory {
    fn kind(&self) -> &'static str {
        "memory"
    }
}

struct Disk;

impl Store for Disk {
    fn kind(&self) -> &'static str {
        "disk"
    }
}

/// Configuration module recording every lifecycle event it sees.
struct AppModule {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
    unloaded: Arc<AtomicUsize>,
}

impl AppModule {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            unloaded: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ComponentModule for AppModule {
    fn name(&self) -> &str {
        "app"
    }

    fn package(&self) -> &str {
        "shop"
    }

    fn register(&self, registrar: &mut Registrar) -> Result<(), BoxError> {
        let events = self.events.clone();
        registrar
            .add(Component::new(|_| Ok(Arc::new(Memory) as Arc<dyn Store>)).named("memory"))
            .add(Component::new(|_| Ok(Arc::new(Disk) as Arc<dyn Store>)).named("disk"))
            .add_listener(FnListener::new("recorder", move |event, _| {
                events.lock().push(event);
                Ok(())
            }));
        Ok(())
    }

    fn unload(&self) -> Result<(), BoxError> {
        self.unloaded.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn quiet(app: Unimbus) -> Unimbus {
    app.with_logging(LoggingConfig::testing())
}

#[test]
fn test_phases_fire_once_in_order() {
    let _serial = SERIAL.lock();
    let module = Arc::new(AppModule::new());
    let events = module.events.clone();

    let mut app = quiet(Unimbus::with_config(Some(module as Arc<dyn ComponentModule>)));
    app.start().unwrap();

    assert_eq!(*events.lock(), LifecycleEvent::ALL.to_vec());
    app.stop().unwrap();
    assert_eq!(events.lock().len(), LifecycleEvent::ALL.len());
}

#[test]
fn test_lookup_through_runtime() {
    let _serial = SERIAL.lock();
    let mut app = quiet(Unimbus::with_config(Some(Arc::new(AppModule::new()))));
    app.start().unwrap();

    let disk = app.get::<dyn Store>(&[Qualifier::named("disk")]).unwrap();
    assert_eq!(disk.kind(), "disk");

    assert!(matches!(
        app.get::<dyn Store>(&[]),
        Err(UnimbusError::Lookup(LookupError::Ambiguous { .. }))
    ));
    assert!(matches!(
        app.get::<dyn Store>(&[Qualifier::named("cloud")]),
        Err(UnimbusError::Lookup(LookupError::Unsatisfied { .. }))
    ));

    let info = app.get::<RuntimeInfo>(&[]).unwrap();
    assert_eq!(info.config_module.as_deref(), Some("app"));
    app.stop().unwrap();
}

#[test]
fn test_startup_total_is_sum_of_phases() {
    let _serial = SERIAL.lock();
    let mut app = quiet(Unimbus::new());
    app.start().unwrap();

    let report = app.startup_report().unwrap().clone();
    assert_eq!(report.phases.len(), LifecycleEvent::ALL.len() + 1);
    assert_eq!(report.total, report.sum_of_phases());
    for event in LifecycleEvent::ALL {
        assert!(report.phase(event.label()).is_some());
    }
    app.stop().unwrap();
}

#[test]
fn test_run_without_config_module() {
    let _serial = SERIAL.lock();
    let mut first = Unimbus::run().unwrap();
    let first_modules: Vec<String> = first
        .container()
        .unwrap()
        .modules()
        .iter()
        .map(|m| m.to_string())
        .collect();
    first.stop().unwrap();

    let mut second = Unimbus::run_with(None).unwrap();
    assert_eq!(second.state(), LifecycleState::Running);
    assert!(second.config_module().is_none());
    assert_eq!(second.container().unwrap().modules(), first_modules);
    second.stop().unwrap();
}

#[test]
fn test_illegal_transitions() {
    let _serial = SERIAL.lock();
    let mut app = quiet(Unimbus::new());

    assert!(matches!(app.stop(), Err(UnimbusError::IllegalState { .. })));
    app.start().unwrap();
    assert!(matches!(app.start(), Err(UnimbusError::IllegalState { .. })));
    app.stop().unwrap();
    assert!(matches!(app.stop(), Err(UnimbusError::IllegalState { .. })));
    assert!(matches!(
        app.get::<RuntimeInfo>(&[]),
        Err(UnimbusError::IllegalState { state: LifecycleState::Stopped, .. })
    ));
}

#[test]
fn test_stop_releases_config_and_unloads_modules() {
    let _serial = SERIAL.lock();
    let module = Arc::new(AppModule::new());
    let unloaded = module.unloaded.clone();

    let mut app = quiet(Unimbus::with_config(Some(module as Arc<dyn ComponentModule>)));
    app.start().unwrap();
    assert!(ConfigProvider::is_loaded());

    app.stop().unwrap();
    assert!(!ConfigProvider::is_loaded());
    assert_eq!(unloaded.load(Ordering::SeqCst), 1);
}

#[test]
fn test_installed_config_is_exposed() {
    let _serial = SERIAL.lock();
    ConfigProvider::set_config(
        Config::builder()
            .with_defaults()
            .with_source(MapSource::new("test", 400).with("shop.currency", "EUR"))
            .build(),
    );

    let mut app = quiet(Unimbus::new());
    app.start().unwrap();
    let config = app.get::<Config>(&[]).unwrap();
    assert_eq!(config.get_value::<String>("shop.currency").unwrap(), "EUR");
    app.stop().unwrap();
}

#[test]
fn test_package_scan_picks_hidden_modules() {
    let _serial = SERIAL.lock();
    let hidden_in_scope = FnModule::new("checkout", |registrar| {
        registrar.add(Component::new(|_| Ok(Arc::new(Memory) as Arc<dyn Store>)).named("cart"));
        Ok(())
    })
    .in_package("shop::checkout")
    .hidden();
    let hidden_elsewhere = FnModule::new("admin", |registrar| {
        registrar.add(Component::new(|_| Ok(Arc::new(Disk) as Arc<dyn Store>)).named("audit"));
        Ok(())
    })
    .in_package("backoffice")
    .hidden();

    let loader = StaticLoader::new("plugins")
        .with_module(Arc::new(hidden_in_scope))
        .with_module(Arc::new(hidden_elsewhere));

    let mut app = quiet(Unimbus::with_config(Some(Arc::new(AppModule::new()))));
    app.set_loader(Arc::new(loader)).unwrap();
    assert!(app.loader().is_some());
    app.start().unwrap();

    assert!(app.get::<dyn Store>(&[Qualifier::named("cart")]).is_ok());
    assert!(matches!(
        app.get::<dyn Store>(&[Qualifier::named("audit")]),
        Err(UnimbusError::Lookup(LookupError::Unsatisfied { .. }))
    ));
    app.stop().unwrap();
}

#[test]
fn test_service_registry_modules_are_discovered() {
    let _serial = SERIAL.lock();
    let app_without_start = Unimbus::new();
    app_without_start.service_registry().register(Arc::new(FnModule::new(
        "registered",
        |registrar| {
            registrar.add_instance(Memory);
            Ok(())
        },
    )));

    let mut app = quiet(app_without_start);
    app.start().unwrap();
    assert_eq!(app.get::<Memory>(&[]).unwrap().kind(), "memory");
    assert!(app
        .application_loader()
        .modules()
        .iter()
        .any(|m| m.name() == "registered"));
    app.stop().unwrap();
}
