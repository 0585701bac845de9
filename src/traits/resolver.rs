//! Resolver traits for service resolution.

use std::any::TypeId;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::inject::{convert_sized, convert_trait};
use crate::key::Key;
use crate::registration::AnyArc;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`Container`](crate::Container) and by the
/// [`ResolverContext`](crate::ResolverContext) handed to factories. Most
/// users should use the [`Resolver`] trait instead, which provides typed
/// methods built on top of this one.
pub trait ResolverCore: Send + Sync {
    /// Resolves `key` and returns the instance in the representation of the
    /// key's own type (`Arc<T>` for concrete keys, `Arc<Arc<dyn I>>` for
    /// trait keys). Name keys return the provider's native representation.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - The resolved service wrapped in `Arc<dyn Any>`
    /// * `Err(DiError)` - Not found, circular, depth exceeded, or a failure
    ///   raised while constructing or injecting the service
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc>;

    /// Resolves `key` and converts the instance to the representation of the
    /// type identified by `view`, using the provider's trait views.
    ///
    /// This is how a name key reaches a trait view of a concrete provider.
    fn resolve_as(&self, key: &Key, view: TypeId) -> DiResult<AnyArc>;
}

/// High-level resolver interface with generic methods for type-safe service
/// resolution.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_static(42usize);
/// builder.register_static_trait::<dyn Logger>(Arc::new(ConsoleLogger));
///
/// let container = builder.build().unwrap();
///
/// let number = container.get_required::<usize>();
/// assert_eq!(*number, 42);
///
/// let logger = container.get_required_trait::<dyn Logger>();
/// assert_eq!(logger.log("resolved"), "LOG: resolved");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service type.
    ///
    /// ```
    /// use ferrous_inject::{ContainerBuilder, Resolver};
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register_static("configuration".to_string());
    ///
    /// let container = builder.build().unwrap();
    /// let config = container.get::<String>().unwrap();
    /// assert_eq!(&*config, "configuration");
    /// ```
    fn get<T: 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&Key::of::<T>())?;
        convert_sized::<T>(any)
    }

    /// Resolves a trait object type registered through a trait view, a trait
    /// factory or a static trait value.
    fn get_trait<T: ?Sized + 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&Key::of_trait::<T>())?;
        convert_trait::<T>(any)
    }

    /// Resolves a service by name and checks that it is a `T`.
    ///
    /// ```
    /// use ferrous_inject::{ContainerBuilder, DiError, Resolver};
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register_static(5432u16).named("db_port");
    /// let container = builder.build().unwrap();
    ///
    /// assert_eq!(*container.get_named::<u16>("db_port").unwrap(), 5432);
    /// assert!(matches!(
    ///     container.get_named::<String>("db_port"),
    ///     Err(DiError::InvalidArgument(_))
    /// ));
    /// ```
    fn get_named<T: 'static + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
        let any = self.resolve_as(&Key::named(name.to_owned()), TypeId::of::<T>())?;
        convert_sized::<T>(any)
    }

    /// Resolves a service by name as the trait object `T`.
    fn get_named_trait<T: ?Sized + 'static + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
        let any = self.resolve_as(&Key::named(name.to_owned()), TypeId::of::<T>())?;
        convert_trait::<T>(any)
    }

    /// Like [`get`](Self::get), with `NotFound` mapped to `None`.
    ///
    /// Every other failure is still returned as an error.
    fn try_get<T: 'static + Send + Sync>(&self) -> DiResult<Option<Arc<T>>> {
        match self.get::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(DiError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolves a concrete service type, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the service cannot be resolved (not found, circular
    /// dependency, factory failure, etc.).
    fn get_required<T: 'static + Send + Sync>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    /// Resolves a trait implementation, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the trait cannot be resolved.
    fn get_required_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Arc<T> {
        self.get_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve trait {}: {}", std::any::type_name::<T>(), e))
    }
}
