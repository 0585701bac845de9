//! Lookup keys for the dependency injection container.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Whether a type tag denotes something the container could construct itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A sized type (struct, enum, primitive)
    Concrete,
    /// A trait object type such as `dyn Logger`
    Abstract,
}

/// Exact type identity used as a lookup key.
///
/// Type tags are not polymorphic: a provider registered for `Postgres` is not
/// reachable through `dyn Database` unless it exposes that view explicitly.
#[derive(Debug, Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
}

impl TypeTag {
    /// Tag of a sized type.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: TypeKind::Concrete,
        }
    }

    /// Tag of a trait object type.
    #[inline]
    pub fn of_trait<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: TypeKind::Abstract,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.kind == TypeKind::Abstract
    }
}

// Identity is the TypeId alone; the name is diagnostic only.
impl PartialEq for TypeTag {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Key for provider storage and lookup.
///
/// Type keys and name keys index into the same provider set: one provider
/// can be reachable through its type, any number of trait views and any
/// number of names.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{ContainerBuilder, Key, Resolver};
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_static(8080u16).named("http_port");
///
/// let container = builder.build().unwrap();
/// let by_type = container.resolve(&Key::of::<u16>()).unwrap();
/// let by_name = container.resolve(&Key::named("http_port")).unwrap();
///
/// assert_eq!(*by_type.downcast::<u16>().unwrap(), 8080);
/// assert_eq!(*by_name.downcast::<u16>().unwrap(), 8080);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Exact type tag, concrete or `dyn Trait`
    Type(TypeTag),
    /// Name key, untyped
    Named(Cow<'static, str>),
}

impl Key {
    /// Key of a sized type.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Key::Type(TypeTag::of::<T>())
    }

    /// Key of a trait object type.
    #[inline]
    pub fn of_trait<T: ?Sized + 'static>() -> Self {
        Key::Type(TypeTag::of_trait::<T>())
    }

    /// Name key.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Key::Named(name.into())
    }

    /// Human-readable type or service name for diagnostics.
    ///
    /// ```rust
    /// use ferrous_inject::Key;
    ///
    /// assert_eq!(Key::of::<u32>().display_name(), "u32");
    /// assert_eq!(Key::named("port").display_name(), "port");
    /// ```
    pub fn display_name(&self) -> &str {
        match self {
            Key::Type(tag) => tag.name,
            Key::Named(name) => name,
        }
    }

    /// The service name for name keys, `None` for type keys.
    pub fn service_name(&self) -> Option<&str> {
        match self {
            Key::Type(_) => None,
            Key::Named(name) => Some(name),
        }
    }

    /// The type tag for type keys, `None` for name keys.
    pub fn type_tag(&self) -> Option<&TypeTag> {
        match self {
            Key::Type(tag) => Some(tag),
            Key::Named(_) => None,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Key::Named(_))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type(tag) => f.write_str(tag.name),
            Key::Named(name) => write!(f, "\"{}\"", name),
        }
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Key::Named(Cow::Borrowed(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Named(Cow::Owned(name))
    }
}

impl From<TypeTag> for Key {
    fn from(tag: TypeTag) -> Self {
        Key::Type(tag)
    }
}

#[inline(always)]
pub fn key_of_type<T: 'static>() -> Key {
    Key::of::<T>()
}
