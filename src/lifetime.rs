//! Provider lifetime definitions.

/// Lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{ContainerBuilder, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct RequestModel { id: u32 }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_factory::<Database, _>(Lifetime::Singleton, |_| Database {
///     url: "postgres://localhost".to_string(),
/// });
/// builder.register_factory::<RequestModel, _>(Lifetime::Transient, |_| RequestModel { id: 7 });
///
/// let container = builder.build().unwrap();
///
/// let db1 = container.get_required::<Database>();
/// let db2 = container.get_required::<Database>();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// let m1 = container.get_required::<RequestModel>();
/// let m2 = container.get_required::<RequestModel>();
/// assert!(!Arc::ptr_eq(&m1, &m2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Single instance per container, cached forever
    ///
    /// Constructed eagerly when the container is built, unless the provider
    /// is lazy, in which case the first resolution constructs it.
    #[default]
    Singleton,
    /// New instance per top-level resolution, never cached
    ///
    /// Within one resolution graph a transient that is requested again
    /// (including through a cycle) yields the instance already built for
    /// that graph.
    Transient,
}

impl Lifetime {
    pub fn is_singleton(self) -> bool {
        self == Lifetime::Singleton
    }
}
