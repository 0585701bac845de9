/// Unit tests for ProviderDescriptor snapshots

use ferrous_inject::{ContainerBuilder, Key, Lifetime, ProviderKind};
use std::sync::Arc;

trait Shape: Send + Sync {}

struct Square;

impl Shape for Square {}

#[test]
fn test_pending_descriptors_have_no_id() {
    let mut builder = ContainerBuilder::new();
    builder.register_static(1u32);
    builder.register_transient::<String, _>(|_| String::new()).named("text");

    let pending = builder.descriptors();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|d| d.id.is_none()));
    assert!(pending.iter().all(|d| !d.instantiated));
    assert_eq!(pending[1].names().collect::<Vec<_>>(), vec!["text"]);
}

#[test]
fn test_built_descriptors_follow_registration_order() {
    let mut builder = ContainerBuilder::new();
    builder.register_static(1u32);
    builder.register_singleton::<u64, _>(|_| 2).lazy();
    builder.register_transient::<String, _>(|_| String::new());

    let container = builder.build().unwrap();
    let descriptors = container.descriptors();

    let ids: Vec<_> = descriptors.iter().map(|d| d.id.unwrap().index()).collect();
    assert_eq!(ids, vec![0, 1, 2]);

    assert_eq!(descriptors[0].kind, ProviderKind::Static);
    assert_eq!(descriptors[1].kind, ProviderKind::SingletonFactory);
    assert_eq!(descriptors[2].kind, ProviderKind::TransientFactory);

    assert!(descriptors[0].instantiated);
    assert!(descriptors[1].lazy);
    assert!(!descriptors[1].instantiated);
    assert!(!descriptors[2].instantiated);
    assert!(!descriptors[2].is_singleton());
}

#[test]
fn test_trait_view_adds_key() {
    let mut builder = ContainerBuilder::new();
    let registration = builder
        .register_singleton::<Square, _>(|_| Square)
        .as_trait::<dyn Shape, _>(|s| s as Arc<dyn Shape>)
        .primary();

    let descriptor = registration.descriptor();
    assert_eq!(descriptor.keys, vec![Key::of::<Square>(), Key::of_trait::<dyn Shape>()]);
    assert!(descriptor.primary);
    assert_eq!(descriptor.impl_type_name, std::any::type_name::<Square>());
    assert_eq!(descriptor.lifetime, Lifetime::Singleton);
    assert!(!descriptor.has_injection_metadata);
}

#[test]
fn test_provider_lookup_by_any_key() {
    let mut builder = ContainerBuilder::new();
    builder
        .register_singleton::<Square, _>(|_| Square)
        .as_trait::<dyn Shape, _>(|s| s as Arc<dyn Shape>)
        .named("square");
    let container = builder.build().unwrap();

    let by_type = container.get_provider(&Key::of::<Square>()).unwrap();
    let by_trait = container.get_provider(&Key::of_trait::<dyn Shape>()).unwrap();
    let by_name = container.get_provider(&Key::named("square")).unwrap();
    assert_eq!(by_type, by_trait);
    assert_eq!(by_trait, by_name);
    assert!(container.try_get_provider(&Key::named("circle")).is_none());
    assert!(container.get_provider(&Key::named("circle")).is_err());
}
