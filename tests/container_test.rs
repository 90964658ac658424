//! 组件容器的集成测试

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use unimbus::errors::{ContainerError, LookupError};
use unimbus::{Component, ContainerBuilder, FnModule, Qualifier, StaticLoader};

/// 测试用的服务trait
trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {}", name)
    }
}

struct French;

impl Greeter for French {
    fn greet(&self, name: &str) -> String {
        format!("Bonjour, {}", name)
    }
}

/// 依赖 Greeter 的服务
struct Reception {
    greeter: Arc<dyn Greeter>,
}

fn english() -> Component<dyn Greeter> {
    Component::new(|_| Ok(Arc::new(English) as Arc<dyn Greeter>))
}

fn french() -> Component<dyn Greeter> {
    Component::new(|_| Ok(Arc::new(French) as Arc<dyn Greeter>))
}

#[test]
fn test_trait_object_resolution() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_component(english())
        .add_component(Component::new(|ctx| {
            Ok(Arc::new(Reception {
                greeter: ctx.get::<dyn Greeter>(&[])?,
            }))
        }));
    let container = builder.initialize().unwrap();

    let reception = container.get::<Reception>(&[]).unwrap();
    assert_eq!(reception.greeter.greet("Ada"), "Hello, Ada");
}

#[test]
fn test_named_qualifier_selects_component() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_component(english().named("english"))
        .add_component(french().named("french"));
    let container = builder.initialize().unwrap();

    let french = container
        .get::<dyn Greeter>(&[Qualifier::named("french")])
        .unwrap();
    assert_eq!(french.greet("Ada"), "Bonjour, Ada");

    // Named components keep @Default, so an unqualified lookup sees both
    let err = container.get::<dyn Greeter>(&[]).err().unwrap();
    match err {
        LookupError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
        other => panic!("expected ambiguous lookup, got {}", other),
    }

    assert!(matches!(
        container.get::<dyn Greeter>(&[Qualifier::named("german")]),
        Err(LookupError::Unsatisfied { .. })
    ));
}

#[test]
fn test_tag_qualifier_drops_default() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_component(english())
        .add_component(french().qualified(Qualifier::tag("fancy")));
    let container = builder.initialize().unwrap();

    assert_eq!(container.get::<dyn Greeter>(&[]).unwrap().greet("x"), "Hello, x");
    assert_eq!(
        container
            .get::<dyn Greeter>(&[Qualifier::tag("fancy")])
            .unwrap()
            .greet("x"),
        "Bonjour, x"
    );
    assert_eq!(container.get_all::<dyn Greeter>(&[Qualifier::Any]).unwrap().len(), 2);
    assert_eq!(container.beans::<dyn Greeter>(&[Qualifier::Any]).len(), 2);
}

#[test]
fn test_alternative_with_highest_priority_wins() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_component(english())
        .add_component(french().alternative(10))
        .add_component(Component::new(|_| Ok(Arc::new(English) as Arc<dyn Greeter>)).alternative(5));
    let container = builder.initialize().unwrap();

    assert_eq!(container.get::<dyn Greeter>(&[]).unwrap().greet("x"), "Bonjour, x");
}

#[test]
fn test_alternatives_with_equal_priority_are_ambiguous() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_component(english().alternative(1))
        .add_component(french().alternative(1));
    let container = builder.initialize().unwrap();

    assert!(!container.is_resolvable::<dyn Greeter>(&[]));
    assert!(container.get::<dyn Greeter>(&[]).err().unwrap().is_ambiguous());
}

#[test]
fn test_module_dependencies_register_in_order() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let record = |name: &'static str| {
        let order = order.clone();
        move |_: &mut unimbus::Registrar| -> Result<(), unimbus::errors::BoxError> {
            order.lock().push(name);
            Ok(())
        }
    };

    let mut builder = ContainerBuilder::new();
    builder
        .add_module(Arc::new(FnModule::new("web", record("web")).depends_on("storage")))
        .add_module(Arc::new(FnModule::new("storage", record("storage"))));
    let container = builder.initialize().unwrap();

    assert_eq!(*order.lock(), vec!["storage", "web"]);
    assert_eq!(container.modules(), vec!["storage", "web"]);
}

#[test]
fn test_missing_module_dependency_fails() {
    let mut builder = ContainerBuilder::new();
    builder.add_module(Arc::new(FnModule::new("web", |_| Ok(())).depends_on("storage")));

    assert!(matches!(builder.initialize(), Err(ContainerError::Module(_))));
}

#[test]
fn test_loader_modules_contribute_components() {
    let loader = StaticLoader::new("plugins").with_module(Arc::new(FnModule::new(
        "greetings",
        |registrar| {
            registrar.add(english());
            Ok(())
        },
    )));

    let mut builder = ContainerBuilder::new();
    builder.set_loader(Arc::new(loader));
    let container = builder.initialize().unwrap();

    assert!(container.is_resolvable::<dyn Greeter>(&[]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_singleton_resolution() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();

    let mut builder = ContainerBuilder::new();
    builder.add_component(Component::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(English) as Arc<dyn Greeter>)
    }));
    let container = Arc::new(builder.initialize().unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            tokio::spawn(async move { container.get::<dyn Greeter>(&[]).map(|g| g.greet("x")) })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "Hello, x");
    }

    let first = container.get::<dyn Greeter>(&[]).unwrap();
    let second = container.get::<dyn Greeter>(&[]).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(container.stats().total_resolutions, 10);
}

/// 慢速工厂创建的组件
struct Slow;

#[test]
fn test_racing_lookups_create_singleton_once() {
    let created = Arc::new(AtomicUsize::new(0));
    let disposed = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let dispose_counter = disposed.clone();

    let mut builder = ContainerBuilder::new();
    builder.add_component(
        Component::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            Ok(Arc::new(Slow))
        })
        .on_dispose(move |_: &Arc<Slow>| {
            dispose_counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    let container = builder.initialize().unwrap();
    let barrier = Barrier::new(8);

    let instances: Vec<Arc<Slow>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    container.get::<Slow>(&[]).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
    assert_eq!(container.stats().singletons_created, 1);

    container.shutdown().unwrap();
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

/// 通过 container() 互相依赖的组件
struct Left;
struct Right;

#[test]
fn test_cycle_through_container_handle_is_reported() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_component(Component::<Left>::new(|ctx| {
            ctx.container().get::<Right>(&[])?;
            Ok(Arc::new(Left))
        }))
        .add_component(Component::<Right>::new(|ctx| {
            ctx.container().get::<Left>(&[])?;
            Ok(Arc::new(Right))
        }));
    let container = builder.initialize().unwrap();

    match container.get::<Left>(&[]) {
        Err(LookupError::CircularDependency { chain }) => {
            assert_eq!(chain.len(), 3);
            assert_eq!(chain.first(), chain.last());
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("cycle should not resolve"),
    }

    // A failed cycle leaves nothing half-built and the thread state clean.
    assert_eq!(container.stats().singletons_created, 0);
    assert!(matches!(
        container.get::<Right>(&[]),
        Err(LookupError::CircularDependency { .. })
    ));
}

#[test]
fn test_dropping_running_container_disposes_singletons() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let unloaded = Arc::new(AtomicUsize::new(0));
    let dispose_counter = disposed.clone();

    struct Tracked {
        unloaded: Arc<AtomicUsize>,
    }

    impl unimbus::ComponentModule for Tracked {
        fn name(&self) -> &str {
            "tracked"
        }

        fn register(&self, _: &mut unimbus::Registrar) -> Result<(), unimbus::errors::BoxError> {
            Ok(())
        }

        fn unload(&self) -> Result<(), unimbus::errors::BoxError> {
            self.unloaded.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let mut builder = ContainerBuilder::new();
    builder
        .add_component(english().on_dispose(move |_| {
            dispose_counter.fetch_add(1, Ordering::SeqCst);
        }))
        .add_module(Arc::new(Tracked {
            unloaded: unloaded.clone(),
        }));
    let container = builder.initialize().unwrap();
    container.get::<dyn Greeter>(&[]).unwrap();

    drop(container);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert_eq!(unloaded.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shutdown_disposes_singletons() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let counter = disposed.clone();

    let mut builder = ContainerBuilder::new();
    builder.add_component(english().on_dispose(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    let container = builder.initialize().unwrap();
    container.get::<dyn Greeter>(&[]).unwrap();

    container.shutdown().unwrap();
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert!(!container.is_running());
    assert!(matches!(
        container.get::<dyn Greeter>(&[]),
        Err(LookupError::ContainerShutDown(_))
    ));
    assert!(matches!(
        container.shutdown(),
        Err(ContainerError::AlreadyShutDown(_))
    ));
}
