//! Provider descriptors for introspection.

use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::{ProviderId, ProviderKind};

/// Snapshot of one provider's registration.
///
/// Returned by `ContainerBuilder::descriptors` (pending providers, no id yet)
/// and `Container::descriptors` / `Container::try_get_provider`.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{ContainerBuilder, Key, Lifetime, ProviderKind};
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_static(3u8).named("retries");
/// builder.register_transient::<String, _>(|_| String::new());
///
/// let container = builder.build().unwrap();
/// let retries = container.try_get_provider(&Key::named("retries")).unwrap();
/// assert_eq!(retries.kind, ProviderKind::Static);
/// assert!(retries.instantiated);
/// assert_eq!(retries.keys, vec![Key::of::<u8>(), Key::named("retries")]);
///
/// let text = container.try_get_provider(&Key::of::<String>()).unwrap();
/// assert_eq!(text.lifetime, Lifetime::Transient);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    /// Position in the built container, `None` before `build()`
    pub id: Option<ProviderId>,
    pub kind: ProviderKind,
    pub lifetime: Lifetime,
    /// Every key the provider was registered under, in registration order
    pub keys: Vec<Key>,
    pub primary: bool,
    pub lazy: bool,
    pub impl_type_name: &'static str,
    /// Whether injection points or hooks run on produced instances
    pub has_injection_metadata: bool,
    /// Whether the singleton cache holds an instance
    pub instantiated: bool,
}

impl ProviderDescriptor {
    pub fn is_singleton(&self) -> bool {
        self.lifetime.is_singleton()
    }

    /// The name keys of this provider.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().filter_map(Key::service_name)
    }
}
