//! 容器生命周期与解析场景的集成测试

use gitai_container::{
    implements, Constructor, ContainerError, Injectable, ServiceContainer, ServiceLifetime,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

// ---- 契约与实现 ----

trait ISomeService: Send + Sync {
    fn name(&self) -> &str;
}

trait IServiceWithOneDependency: Send + Sync {
    fn dependency(&self) -> Arc<dyn ISomeService>;
}

struct SomeService;

impl ISomeService for SomeService {
    fn name(&self) -> &str {
        "some"
    }
}

impl Injectable for SomeService {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new("SomeService()", |(): ()| SomeService)]
    }
}

implements!(SomeService => dyn ISomeService);

struct ServiceWithOneDependency {
    some: Arc<dyn ISomeService>,
}

impl IServiceWithOneDependency for ServiceWithOneDependency {
    fn dependency(&self) -> Arc<dyn ISomeService> {
        Arc::clone(&self.some)
    }
}

impl Injectable for ServiceWithOneDependency {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(
            "ServiceWithOneDependency(ISomeService)",
            |(some,): (Arc<dyn ISomeService>,)| ServiceWithOneDependency { some },
        )]
    }
}

implements!(ServiceWithOneDependency => dyn IServiceWithOneDependency);

// C, B(C), A(B, C) | A(D)

struct C;
struct D;

struct B {
    c: Arc<C>,
}

struct A {
    b: Option<Arc<B>>,
    c: Option<Arc<C>>,
}

impl Injectable for C {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new("C()", |(): ()| C)]
    }
}

impl Injectable for B {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new("B(C)", |(c,): (Arc<C>,)| B { c })]
    }
}

impl Injectable for A {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::new("A(D)", |(_d,): (Arc<D>,)| A { b: None, c: None }),
            Constructor::new("A(B, C)", |(b, c): (Arc<B>, Arc<C>)| A {
                b: Some(b),
                c: Some(c),
            })
            .preferred(),
        ]
    }
}

struct Plain;

impl Injectable for Plain {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new("Plain()", |(): ()| Plain)]
    }
}

// ---- 生命周期 ----

#[test]
fn test_transient_yields_distinct_instances() {
    let container = ServiceContainer::new();
    container.register_transient::<Plain, Plain>().unwrap();

    let scope = container.create_scope();
    let first = scope.resolve::<Plain>().unwrap();
    let second = scope.resolve::<Plain>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_scoped_identity_within_and_across_scopes() {
    let container = ServiceContainer::new();
    container.register_scoped::<Plain, Plain>().unwrap();

    let scope_a = container.create_scope();
    let scope_b = container.create_scope();

    let a1 = scope_a.resolve::<Plain>().unwrap();
    let a2 = scope_a.resolve::<Plain>().unwrap();
    let b1 = scope_b.resolve::<Plain>().unwrap();

    assert!(Arc::ptr_eq(&a1, &a2));
    assert!(!Arc::ptr_eq(&a1, &b1));
}

#[test]
fn test_singleton_identity_across_scopes() {
    let container = ServiceContainer::new();
    container
        .register_singleton::<dyn ISomeService, SomeService>()
        .unwrap();

    let direct = container.get_singleton::<dyn ISomeService>().unwrap();
    for _ in 0..3 {
        let scope = container.create_scope();
        let resolved = scope.resolve::<dyn ISomeService>().unwrap();
        assert!(Arc::ptr_eq(&direct, &resolved));
    }
}

#[test]
fn test_unregistered_contract_fails_everywhere() {
    let container = ServiceContainer::new();
    let expected = ContainerError::NotRegistered {
        contract: std::any::type_name::<dyn ISomeService>(),
    };

    let scope = container.create_scope();
    assert_eq!(scope.resolve::<dyn ISomeService>().err(), Some(expected.clone()));
    assert_eq!(container.get_singleton::<dyn ISomeService>().err(), Some(expected));
}

#[test]
fn test_duplicate_registration_keeps_first() {
    let container = ServiceContainer::new();
    container.register_singleton::<Plain, Plain>().unwrap();

    let err = container.register_transient::<Plain, Plain>().unwrap_err();
    assert!(matches!(err, ContainerError::DuplicateRegistration { .. }));
    assert_eq!(
        container.lookup::<Plain>().map(|d| d.lifetime()),
        Some(ServiceLifetime::Singleton)
    );
}

#[test]
fn test_late_registration_visible_and_singletons_kept() {
    let container = ServiceContainer::new();
    container.register_singleton::<C, C>().unwrap();
    let first_c = container.get_singleton::<C>().unwrap();

    assert_eq!(
        container.get_singleton::<B>().err(),
        Some(ContainerError::NotRegistered {
            contract: std::any::type_name::<B>(),
        })
    );

    container.register_singleton::<B, B>().unwrap();

    let b = container.get_singleton::<B>().unwrap();
    assert!(Arc::ptr_eq(&b.c, &first_c));
    assert!(Arc::ptr_eq(&container.get_singleton::<C>().unwrap(), &first_c));
}

// ---- 场景 ----

#[test]
fn test_marked_constructor_built_from_cached_singletons() {
    let container = ServiceContainer::new();
    container.register_singleton::<C, C>().unwrap();
    container.register_singleton::<B, B>().unwrap();
    container.register_singleton::<A, A>().unwrap();

    let a = container.get_singleton::<A>().unwrap();
    let b = container.get_singleton::<B>().unwrap();
    let c = container.get_singleton::<C>().unwrap();

    assert!(Arc::ptr_eq(a.b.as_ref().unwrap(), &b));
    assert!(Arc::ptr_eq(a.c.as_ref().unwrap(), &c));
    assert!(Arc::ptr_eq(&b.c, &c));
}

#[test]
fn test_injected_dependency_is_the_shared_singleton() {
    let container = ServiceContainer::new();
    container
        .register_singleton::<dyn ISomeService, SomeService>()
        .unwrap();
    container
        .register_singleton::<dyn IServiceWithOneDependency, ServiceWithOneDependency>()
        .unwrap();

    let scope = container.create_scope();
    let service = scope.resolve::<dyn IServiceWithOneDependency>().unwrap();
    let some = scope.resolve::<dyn ISomeService>().unwrap();

    assert!(Arc::ptr_eq(&service.dependency(), &some));
    assert_eq!(service.dependency().name(), "some");
}

#[test]
fn test_singleton_depending_on_scoped_is_rejected() {
    let container = ServiceContainer::new();
    container.register_scoped::<C, C>().unwrap();
    container.register_singleton::<B, B>().unwrap();

    let err = container.get_singleton::<B>().err().unwrap();
    assert_eq!(
        err,
        ContainerError::WrongLifetime {
            contract: std::any::type_name::<C>(),
            actual: ServiceLifetime::Scoped,
        }
    );
    // 失败不会留下缓存
    assert_eq!(container.stats().active_singletons, 0);
}

#[test]
fn test_transient_may_depend_on_scoped() {
    let container = ServiceContainer::new();
    container.register_scoped::<C, C>().unwrap();
    container.register_transient::<B, B>().unwrap();

    let scope = container.create_scope();
    let first = scope.resolve::<B>().unwrap();
    let second = scope.resolve::<B>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.c, &second.c));
}

#[test]
fn test_resolve_macro() {
    let container = ServiceContainer::new();
    container.register_scoped::<Plain, Plain>().unwrap();

    let scope = container.create_scope();
    let plain = gitai_container::resolve!(scope, Plain).unwrap();
    assert!(Arc::ptr_eq(&plain, &scope.resolve::<Plain>().unwrap()));
}

// ---- 并发 ----

static HEAVY_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct Heavy;

impl Injectable for Heavy {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new("Heavy()", |(): ()| {
            HEAVY_BUILDS.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Heavy
        })]
    }
}

#[test]
fn test_concurrent_singleton_built_once() {
    let container = ServiceContainer::new();
    container.register_singleton::<Heavy, Heavy>().unwrap();

    let threads = 16;
    let barrier = Barrier::new(threads);

    let instances: Vec<Arc<Heavy>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let container = container.clone();
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    // 每个线程用自己的作用域
                    let scope = container.create_scope();
                    scope.resolve::<Heavy>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(HEAVY_BUILDS.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

// ---- 统计 ----

#[test]
fn test_stats_track_resolutions() {
    let container = ServiceContainer::new();
    container.register_singleton::<C, C>().unwrap();
    container.register_scoped::<B, B>().unwrap();
    container.register_transient::<Plain, Plain>().unwrap();

    let scope = container.create_scope();
    scope.resolve::<B>().unwrap();
    scope.resolve::<B>().unwrap();
    scope.resolve::<Plain>().unwrap();

    let stats = container.stats();
    assert_eq!(stats.total_resolutions, 3);
    assert_eq!(stats.scoped_creations, 1);
    assert_eq!(stats.scoped_cache_hits, 1);
    assert_eq!(stats.transient_creations, 1);
    assert_eq!(stats.singleton_cache_misses, 1);
    assert_eq!(stats.scopes_created, 1);
    assert_eq!(stats.registered_services, 3);
    assert_eq!(stats.creation_distribution(), (1, 1, 1));
}
