//! Resolver context handed to factory functions.

use std::any::TypeId;

use super::Container;
use crate::error::DiResult;
use crate::inject::FactoryOf;
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::{Resolver, ResolverCore};

/// Context passed to factory functions for resolving dependencies.
///
/// Resolutions made through the context join the resolution that invoked
/// the factory, so a cycle that passes through an already built instance is
/// closed instead of recursing.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_static(Database { url: "postgres://localhost".to_string() });
/// builder.register_singleton::<UserService, _>(|resolver| UserService {
///     db: resolver.get_required::<Database>(),
/// });
///
/// let container = builder.build().unwrap();
/// assert_eq!(container.get_required::<UserService>().db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    container: &'a Container,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// The container running this factory.
    pub fn container(&self) -> &Container {
        self.container
    }

    /// A deferred handle on `T`, for factories that must not construct it yet.
    pub fn factory_of<T: Send + Sync + 'static>(&self) -> DiResult<FactoryOf<T>> {
        self.container.factory_of::<T>()
    }
}

impl ResolverCore for ResolverContext<'_> {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.container.resolve(key)
    }

    fn resolve_as(&self, key: &Key, view: TypeId) -> DiResult<AnyArc> {
        self.container.resolve_view(key, view)
    }
}

impl Resolver for ResolverContext<'_> {}
