//! Injection slots and factory-of wrappers.
//!
//! Services declare their dependencies as [`Inject<T>`] fields (filled by the
//! container after construction) or [`FactoryOf<T>`] fields (a handle that
//! resolves `T` only when asked). Both are write-once: the container fills an
//! empty slot and never replaces a filled one.

use std::any::TypeId;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::{Container, ContainerInner};
use crate::registration::AnyArc;

/// A dependency slot filled by the injector.
///
/// The slot holds an `Arc`, so a service that takes part in a cycle sees the
/// same object its peers see, fully injected once the outermost resolution
/// returns.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{ContainerBuilder, Describe, Descriptor, Inject, Provide, Resolver};
///
/// #[derive(Default)]
/// struct Config { url: String }
///
/// #[derive(Default)]
/// struct Repository { config: Inject<Config> }
///
/// impl Describe for Repository {
///     fn describe(d: &mut Descriptor<Self>) {
///         d.default_constructor();
///         d.service(Provide::singleton());
///         d.inject("config", |s: &Repository| &s.config);
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_static(Config { url: "postgres://localhost".into() });
/// builder.scan::<Repository>().unwrap();
///
/// let container = builder.build().unwrap();
/// let repo = container.get::<Repository>().unwrap();
/// assert_eq!(repo.config.url, "postgres://localhost");
/// ```
pub struct Inject<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized> Inject<T> {
    /// Creates an empty slot.
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// Creates a slot that is already filled; the injector skips it.
    pub fn with(value: Arc<T>) -> Self {
        Self {
            cell: OnceCell::with_value(value),
        }
    }

    /// The injected value, or `None` while the slot is empty.
    pub fn try_get(&self) -> Option<&Arc<T>> {
        self.cell.get()
    }

    /// The injected value.
    ///
    /// # Panics
    ///
    /// Panics if the slot was never filled, e.g. an optional dependency that
    /// was not registered. Use [`try_get`](Self::try_get) for those.
    pub fn get(&self) -> &Arc<T> {
        self.cell.get().unwrap_or_else(|| {
            panic!(
                "Inject<{}> accessed before injection",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn is_filled(&self) -> bool {
        self.cell.get().is_some()
    }

    pub(crate) fn fill(&self, value: Arc<T>) {
        // A filled slot keeps its first value.
        let _ = self.cell.set(value);
    }
}

impl<T: ?Sized> Default for Inject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T: ?Sized> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("type", &std::any::type_name::<T>())
            .field("filled", &self.is_filled())
            .finish()
    }
}

/// User-supplied factory object.
///
/// A type implementing `ServiceFactory<T>` can be registered as a custom
/// factory: the factory object itself becomes a resolvable singleton and `T`
/// becomes a first-class provider whose production calls [`create`](Self::create).
///
/// ```rust
/// use ferrous_inject::{ContainerBuilder, Resolver, ServiceFactory};
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// struct Ticket(u32);
///
/// #[derive(Default)]
/// struct TicketMachine { next: AtomicU32 }
///
/// impl ServiceFactory<Ticket> for TicketMachine {
///     fn create(&self) -> Ticket {
///         Ticket(self.next.fetch_add(1, Ordering::SeqCst))
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_custom_factory::<Ticket, _>(TicketMachine::default());
/// let container = builder.build().unwrap();
///
/// assert_eq!(container.get_required::<Ticket>().0, 0);
/// assert_eq!(container.get_required::<Ticket>().0, 1);
/// ```
pub trait ServiceFactory<T>: Send + Sync + 'static {
    /// Produces a new instance.
    fn create(&self) -> T;
}

struct Binding<T: ?Sized> {
    container: Weak<ContainerInner>,
    key: Key,
    view: TypeId,
    convert: fn(AnyArc) -> DiResult<Arc<T>>,
}

/// Factory-of wrapper: a deferred handle on a provider.
///
/// Injecting a `FactoryOf<T>` never constructs `T`; each [`get`](Self::get)
/// performs a real resolution. Lazy singletons are exposed this way so their
/// construction waits until first use, and singletons use it to reach
/// transients without freezing one instance.
pub struct FactoryOf<T: ?Sized> {
    binding: OnceCell<Binding<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> FactoryOf<T> {
    /// Creates an unbound wrapper, to be bound by the injector.
    pub const fn new() -> Self {
        Self {
            binding: OnceCell::new(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// The key this wrapper resolves, once bound.
    pub fn key(&self) -> Option<&Key> {
        self.binding.get().map(|b| &b.key)
    }

    /// Resolves `T` through the container.
    ///
    /// Singletons return their cached instance after the first call;
    /// transients produce a new instance per call.
    pub fn get(&self) -> DiResult<Arc<T>> {
        let binding = self.binding.get().ok_or_else(|| {
            DiError::InvalidArgument(format!(
                "FactoryOf<{}> used before it was bound",
                std::any::type_name::<T>()
            ))
        })?;
        let inner = binding
            .container
            .upgrade()
            .ok_or_else(|| DiError::ContainerDropped(binding.key.to_string()))?;
        let container = Container::from_inner(inner);
        let any = container.resolve_view(&binding.key, binding.view)?;
        (binding.convert)(any)
    }

    pub(crate) fn bind(&self, container: Weak<ContainerInner>, key: Key, view: TypeId, convert: fn(AnyArc) -> DiResult<Arc<T>>) {
        let _ = self.binding.set(Binding {
            container,
            key,
            view,
            convert,
        });
    }

    pub(crate) fn bound(container: Weak<ContainerInner>, key: Key, view: TypeId, convert: fn(AnyArc) -> DiResult<Arc<T>>) -> Self {
        let factory = Self::new();
        factory.bind(container, key, view, convert);
        factory
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for FactoryOf<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for FactoryOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryOf")
            .field("type", &std::any::type_name::<T>())
            .field("key", &self.binding.get().map(|b| b.key.to_string()))
            .finish()
    }
}

pub(crate) fn convert_sized<T: Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::mismatch(std::any::type_name::<T>(), "a different type"))
}

// Trait objects travel as Arc<Arc<dyn Trait>> inside the Any.
pub(crate) fn convert_trait<T: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::mismatch(std::any::type_name::<T>(), "a different type"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_write_once() {
        let slot: Inject<u32> = Inject::new();
        assert!(slot.try_get().is_none());
        slot.fill(Arc::new(1));
        slot.fill(Arc::new(2));
        assert_eq!(**slot.get(), 1);
        assert_eq!(*slot, 1);
    }

    #[test]
    #[should_panic(expected = "accessed before injection")]
    fn empty_slot_panics_on_get() {
        let slot: Inject<String> = Inject::default();
        let _ = slot.get();
    }

    #[test]
    fn unbound_factory_reports_invalid_argument() {
        let factory: FactoryOf<u8> = FactoryOf::new();
        assert!(!factory.is_bound());
        assert!(matches!(factory.get(), Err(DiError::InvalidArgument(_))));
    }

    #[test]
    fn trait_conversion_unwraps_inner_arc() {
        trait Named: Send + Sync {
            fn name(&self) -> &str;
        }
        struct A;
        impl Named for A {
            fn name(&self) -> &str {
                "a"
            }
        }
        let inner: Arc<dyn Named> = Arc::new(A);
        let any: AnyArc = Arc::new(inner);
        let back = convert_trait::<dyn Named>(any).unwrap();
        assert_eq!(back.name(), "a");
        assert!(convert_sized::<u8>(Arc::new(1u16)).is_err());
    }
}
