//! Observers for resolution and construction events.
//!
//! Observers are attached to the builder and shared by every container it
//! builds. The `created` event is the extension point for host integrations
//! that must act on each freshly constructed instance (attaching it to an
//! engine's object tree, registering it with an event bus, ...).

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, ProviderId};

/// A freshly constructed instance.
///
/// Fired once per instance the container actually builds, after injection and
/// post-inject hooks. Static values and cache hits do not fire it.
pub struct CreatedEvent<'a> {
    pub lifetime: Lifetime,
    pub type_name: &'static str,
    pub provider: ProviderId,
    pub instance: &'a AnyArc,
}

impl CreatedEvent<'_> {
    /// The instance as a concrete `T`, if it is one.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }
}

/// Observer trait for container events.
///
/// All methods have empty defaults; implement the ones you need. Calls are
/// made synchronously on the resolving thread, so keep them cheap.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{ContainerBuilder, CreatedEvent, DiObserver, Resolver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct CountCreated(AtomicUsize);
///
/// impl DiObserver for CountCreated {
///     fn created(&self, _event: &CreatedEvent<'_>) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let observer = Arc::new(CountCreated::default());
/// let mut builder = ContainerBuilder::new();
/// builder.add_observer(observer.clone());
/// builder.register_static(1u8);
/// builder.register_transient::<String, _>(|_| "fresh".to_string());
///
/// let container = builder.build().unwrap();
/// container.get_required::<String>();
/// container.get_required::<String>();
/// container.get_required::<u8>();
/// assert_eq!(observer.0.load(Ordering::SeqCst), 2);
/// ```
pub trait DiObserver: Send + Sync {
    fn resolving(&self, _key: &Key) {}

    fn resolved(&self, _key: &Key, _duration: Duration) {}

    fn resolution_failed(&self, _key: &Key, _error: &DiError) {}

    fn created(&self, _event: &CreatedEvent<'_>) {}
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &Key) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    #[inline]
    pub(crate) fn resolution_failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.resolution_failed(key, error);
        }
    }

    #[inline]
    pub(crate) fn created(&self, event: &CreatedEvent<'_>) {
        for observer in &self.observers {
            observer.created(event);
        }
    }
}

/// Closure adapter used by `ContainerBuilder::on_created`.
pub(crate) struct OnCreated<F>(pub(crate) F);

impl<F> DiObserver for OnCreated<F>
where
    F: Fn(&CreatedEvent<'_>) + Send + Sync,
{
    fn created(&self, event: &CreatedEvent<'_>) {
        (self.0)(event)
    }
}

/// Forwards container events to `tracing`.
///
/// Resolutions are logged at `TRACE`, constructions at `DEBUG` and failures
/// at `WARN`, all under the `ferrous_inject` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl DiObserver for TracingObserver {
    fn resolving(&self, key: &Key) {
        tracing::trace!(target: "ferrous_inject", key = %key, "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        tracing::trace!(target: "ferrous_inject", key = %key, ?duration, "resolved");
    }

    fn resolution_failed(&self, key: &Key, error: &DiError) {
        tracing::warn!(target: "ferrous_inject", key = %key, %error, "resolution failed");
    }

    fn created(&self, event: &CreatedEvent<'_>) {
        tracing::debug!(
            target: "ferrous_inject",
            type_name = event.type_name,
            lifetime = ?event.lifetime,
            provider = %event.provider,
            "instance created"
        );
    }
}
