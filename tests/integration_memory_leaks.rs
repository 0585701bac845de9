/// Memory ownership integration tests
///
/// Verifies that instances are released with the container that owns them
/// and that transients are never retained by the container.

use ferrous_inject::{ContainerBuilder, Describe, Descriptor, FactoryOf, Provide, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

static DROPS: AtomicUsize = AtomicUsize::new(0);

struct Tracked;

impl Drop for Tracked {
    fn drop(&mut self) {
        DROPS.fetch_add(1, Ordering::SeqCst);
    }
}

struct Buffer {
    bytes: Vec<u8>,
}

#[test]
fn singletons_are_released_with_the_container() {
    let mut builder = ContainerBuilder::new();
    builder.register_singleton::<Buffer, _>(|_| Buffer { bytes: vec![0; 1024] });
    let container = builder.build().unwrap();

    let weak: Weak<Buffer> = Arc::downgrade(&container.get_required::<Buffer>());
    assert_eq!(weak.upgrade().unwrap().bytes.len(), 1024);

    let clone = container.clone();
    drop(container);
    assert!(weak.upgrade().is_some());

    drop(clone);
    assert!(weak.upgrade().is_none());
}

#[test]
fn transients_are_not_retained() {
    let mut builder = ContainerBuilder::new();
    builder.register_transient::<Tracked, _>(|_| Tracked);
    let container = builder.build().unwrap();

    let before = DROPS.load(Ordering::SeqCst);
    for _ in 0..100 {
        let instance = container.get_required::<Tracked>();
        drop(instance);
    }
    assert_eq!(DROPS.load(Ordering::SeqCst) - before, 100);
}

#[derive(Default)]
struct Holder {
    buffer: FactoryOf<Buffer>,
}

impl Describe for Holder {
    fn describe(d: &mut Descriptor<Self>) {
        d.default_constructor().service(Provide::singleton());
        d.inject_factory("buffer", |s: &Holder| &s.buffer);
    }
}

#[test]
fn factory_handles_do_not_keep_the_container_alive() {
    let mut builder = ContainerBuilder::new();
    builder.register_singleton::<Buffer, _>(|_| Buffer { bytes: vec![1; 16] }).lazy();
    builder.scan::<Holder>().unwrap();
    let container = builder.build().unwrap();

    let holder = container.get_required::<Holder>();
    let buffer = Arc::downgrade(&holder.buffer.get().unwrap());
    drop(container);

    // The holder still exists, but its container and singletons are gone
    assert!(buffer.upgrade().is_none());
    assert!(holder.buffer.get().is_err());
}
