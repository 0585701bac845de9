//! Error types for the dependency injection container.

use std::error::Error as StdError;
use std::sync::Arc;

/// Boxed error produced by user factories and post-inject hooks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Dependency injection errors
///
/// Every failure of `scan`, `build` or `resolve` is reported through this
/// type, synchronously, to the caller of the triggering method. Nothing is
/// retried by the container.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{ContainerBuilder, DiError, Resolver};
///
/// let container = ContainerBuilder::new().build().unwrap();
/// match container.get::<String>() {
///     Err(DiError::NotFound(name)) => assert_eq!(name, "alloc::string::String"),
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_inject::DiError;
///
/// let circular = DiError::Circular(vec!["ServiceA", "ServiceB", "ServiceA"]);
/// assert_eq!(circular.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// Key absent from the registry and not auto-creatable
    #[error("Service not found: {0}")]
    NotFound(String),

    /// Bad argument: auto-creation of an abstract type, or a produced value
    /// that does not match the requested type
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Two providers claim the same name key in one build
    #[error("Duplicate name \"{name}\": already registered by {existing}, registered again by {duplicate}")]
    DuplicateName {
        name: String,
        existing: &'static str,
        duplicate: &'static str,
    },

    /// Conflicting or malformed declarative metadata
    #[error("Invalid metadata on {type_name}: {reason}")]
    InvalidMetadata {
        type_name: &'static str,
        reason: String,
    },

    /// An injection point could not be satisfied
    #[error("Cannot inject {service}::{member}: {source}")]
    InjectMember {
        service: &'static str,
        member: &'static str,
        #[source]
        source: Box<DiError>,
    },

    /// A singleton tried to capture a transient directly
    #[error("Lifetime error: singleton {singleton} cannot hold transient {transient} directly, inject a FactoryOf instead")]
    WrongLifetime {
        singleton: &'static str,
        transient: &'static str,
    },

    /// A factory re-entered its own provider before producing an instance
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),

    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),

    /// A user factory failed
    #[error("Factory for {service} failed: {source}")]
    Factory {
        service: &'static str,
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// A post-inject hook failed
    #[error("Post-inject hook {service}::{hook} failed: {source}")]
    Hook {
        service: &'static str,
        hook: &'static str,
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// A `FactoryOf` outlived the container that bound it
    #[error("Container dropped before {0} could be produced")]
    ContainerDropped(String),
}

impl DiError {
    /// Wraps an arbitrary error raised inside a factory.
    ///
    /// ```rust
    /// use ferrous_inject::DiError;
    ///
    /// let err = DiError::factory("Database", std::io::Error::other("refused"));
    /// assert_eq!(err.to_string(), "Factory for Database failed: refused");
    /// ```
    pub fn factory<E>(service: &'static str, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        DiError::Factory {
            service,
            source: Arc::from(error.into()),
        }
    }

    /// Returns true for `NotFound`, the only error an optional slot tolerates.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DiError::NotFound(_))
    }

    pub(crate) fn metadata(type_name: &'static str, reason: impl Into<String>) -> Self {
        DiError::InvalidMetadata {
            type_name,
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(expected: &'static str, found: &'static str) -> Self {
        DiError::InvalidArgument(format!(
            "type mismatch: expected {}, provider produces {}",
            expected, found
        ))
    }
}

/// Result type for DI operations
///
/// ```rust
/// use ferrous_inject::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::NotFound("some_service".to_string()))
/// }
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
