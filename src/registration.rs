//! Provider definitions and the frozen registry.

use std::any::{Any, TypeId};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::descriptors::ProviderDescriptor;
use crate::error::{DiError, DiResult};
use crate::key::{Key, TypeTag};
use crate::lifetime::Lifetime;
use crate::metadata::TypeMetadata;
use crate::provider::ResolverContext;

/// Type-erased shared instance, as stored and handed out by the container.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Borrowed instance handed to injection points and hooks.
pub(crate) type Target = dyn Any + Send + Sync;

pub(crate) type Ctor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

pub(crate) type CastFn = Arc<dyn Fn(AnyArc) -> DiResult<AnyArc> + Send + Sync>;

/// Erases a production closure, fixing its signature through the bound.
pub(crate) fn ctor<F>(f: F) -> Ctor
where
    F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(feature = "ahash")]
pub(crate) type Map<K, V> = ahash::AHashMap<K, V>;
#[cfg(not(feature = "ahash"))]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;
#[cfg(feature = "ahash")]
pub(crate) type Set<K> = ahash::AHashSet<K>;
#[cfg(not(feature = "ahash"))]
pub(crate) type Set<K> = std::collections::HashSet<K>;

/// Identity of a provider inside one built container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(pub(crate) usize);

impl ProviderId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Provider variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Pre-built value, always a singleton
    Static,
    /// Factory run at most once, result cached
    SingletonFactory,
    /// Factory run on every top-level resolution
    TransientFactory,
    /// Product of a user `ServiceFactory` object
    CustomFactory,
}

#[derive(Clone)]
pub(crate) enum Production {
    Value(AnyArc),
    Factory(Ctor),
}

/// A trait view of a concrete provider: the extra type tag it answers to and
/// the cast that turns the concrete instance into `Arc<dyn Trait>`.
#[derive(Clone)]
pub(crate) struct View {
    pub(crate) tag: TypeTag,
    pub(crate) cast: CastFn,
}

/// View of a concrete `T` as `dyn I`, built from a user cast such as
/// `|c| c as Arc<dyn Logger>`.
pub(crate) fn trait_view<T, I, F>(cast: F) -> View
where
    T: Send + Sync + 'static,
    I: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
{
    View {
        tag: TypeTag::of_trait::<I>(),
        cast: Arc::new(move |raw: AnyArc| {
            let concrete = raw
                .downcast::<T>()
                .map_err(|_| DiError::mismatch(std::any::type_name::<T>(), "a different type"))?;
            Ok(Arc::new(cast(concrete)) as AnyArc)
        }),
    }
}

/// Pending provider, accumulated by the builder.
#[derive(Clone)]
pub(crate) struct ProviderDef {
    pub(crate) production: Production,
    pub(crate) custom: bool,
    pub(crate) lifetime: Lifetime,
    pub(crate) keys: SmallVec<[Key; 4]>,
    pub(crate) primary: bool,
    pub(crate) lazy: bool,
    pub(crate) impl_tag: TypeTag,
    pub(crate) views: Vec<View>,
    pub(crate) metadata: Option<Arc<TypeMetadata>>,
    /// Metadata problem found while registering, reported by `build()`
    pub(crate) error: Option<DiError>,
}

impl ProviderDef {
    pub(crate) fn new(impl_tag: TypeTag, lifetime: Lifetime, production: Production) -> Self {
        let mut keys = SmallVec::new();
        keys.push(Key::Type(impl_tag));
        Self {
            production,
            custom: false,
            lifetime,
            keys,
            primary: false,
            lazy: false,
            impl_tag,
            views: Vec::new(),
            metadata: None,
            error: None,
        }
    }

    pub(crate) fn add_name(&mut self, name: Key) {
        if !self.keys.contains(&name) {
            self.keys.push(name);
        }
    }

    pub(crate) fn add_view(&mut self, view: View) {
        let key = Key::Type(view.tag);
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self.views.retain(|v| v.tag != view.tag);
        self.views.push(view);
    }

    /// Drops the implementation's own type key, keeping names and views.
    pub(crate) fn remove_own_type_key(&mut self) {
        let own = Key::Type(self.impl_tag);
        self.keys.retain(|k| *k != own);
    }

    pub(crate) fn kind(&self) -> ProviderKind {
        match (&self.production, self.custom, self.lifetime) {
            (Production::Value(_), _, _) => ProviderKind::Static,
            (_, true, _) => ProviderKind::CustomFactory,
            (_, false, Lifetime::Singleton) => ProviderKind::SingletonFactory,
            (_, false, Lifetime::Transient) => ProviderKind::TransientFactory,
        }
    }

    pub(crate) fn descriptor(&self, id: Option<ProviderId>, instantiated: bool) -> ProviderDescriptor {
        ProviderDescriptor {
            id,
            kind: self.kind(),
            lifetime: self.lifetime,
            keys: self.keys.to_vec(),
            primary: self.primary,
            lazy: self.lazy,
            impl_type_name: self.impl_tag.name(),
            has_injection_metadata: self.metadata.is_some(),
            instantiated,
        }
    }
}

/// Frozen provider inside a built container.
pub(crate) struct Provider {
    pub(crate) id: ProviderId,
    pub(crate) def: ProviderDef,
}

impl Provider {
    pub(crate) fn new(id: ProviderId, def: ProviderDef) -> Self {
        Self { id, def }
    }

    #[inline]
    pub(crate) fn name(&self) -> &'static str {
        self.def.impl_tag.name()
    }

    #[inline]
    pub(crate) fn lifetime(&self) -> Lifetime {
        self.def.lifetime
    }

    pub(crate) fn is_static(&self) -> bool {
        matches!(self.def.production, Production::Value(_))
    }

    /// Runs the production step: hands out the held value or calls the factory.
    pub(crate) fn produce(&self, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        match &self.def.production {
            Production::Value(value) => Ok(value.clone()),
            Production::Factory(ctor) => ctor(ctx),
        }
    }

    /// Converts a raw instance into the representation expected for `view`.
    ///
    /// The implementation's own type and unknown views pass through
    /// unchanged; the caller's downcast reports any mismatch.
    pub(crate) fn project(&self, raw: AnyArc, view: TypeId) -> DiResult<AnyArc> {
        if view == self.def.impl_tag.id() {
            return Ok(raw);
        }
        match self.def.views.iter().find(|v| v.tag.id() == view) {
            Some(v) => (v.cast)(raw),
            None => Ok(raw),
        }
    }
}

/// Concrete type the container may build on demand when `create_if_not_found`
/// is enabled.
#[derive(Clone)]
pub(crate) struct Creatable {
    pub(crate) tag: TypeTag,
    pub(crate) ctor: Ctor,
    pub(crate) metadata: Arc<TypeMetadata>,
}

/// Frozen key to provider mapping.
pub(crate) struct Registry {
    providers: Vec<Arc<Provider>>,
    by_key: Map<Key, usize>,
    creatable: Map<TypeId, Creatable>,
}

impl Registry {
    /// Validates pending definitions and indexes every key.
    ///
    /// Name keys must be unique across providers. Type keys shared by several
    /// providers resolve to the most recently registered primary one, or to
    /// the first registered when none is primary.
    pub(crate) fn freeze(defs: &[ProviderDef], creatable: &Map<TypeId, Creatable>) -> DiResult<Self> {
        let mut providers: Vec<Arc<Provider>> = Vec::with_capacity(defs.len());
        let mut by_key: Map<Key, usize> = Map::default();

        for (index, def) in defs.iter().enumerate() {
            if let Some(error) = &def.error {
                return Err(error.clone());
            }
            let name = def.impl_tag.name();
            if def.keys.is_empty() {
                return Err(DiError::InvalidArgument(format!(
                    "provider for {} has no lookup keys",
                    name
                )));
            }
            if def.lazy && def.lifetime == Lifetime::Transient {
                return Err(DiError::InvalidArgument(format!(
                    "lazy applies only to singletons, {} is transient",
                    name
                )));
            }
            if matches!(def.production, Production::Value(_)) && def.lifetime != Lifetime::Singleton {
                return Err(DiError::InvalidArgument(format!(
                    "static value {} must be a singleton",
                    name
                )));
            }

            for key in &def.keys {
                match (key, by_key.get(key).copied()) {
                    (Key::Named(dup), Some(existing)) => {
                        return Err(DiError::DuplicateName {
                            name: dup.to_string(),
                            existing: providers[existing].name(),
                            duplicate: name,
                        });
                    }
                    (Key::Type(tag), Some(existing)) => {
                        if def.primary {
                            tracing::trace!(
                                key = tag.name(),
                                replaced = providers[existing].name(),
                                by = name,
                                "primary provider takes over type key"
                            );
                            by_key.insert(key.clone(), index);
                        }
                    }
                    (_, None) => {
                        by_key.insert(key.clone(), index);
                    }
                }
            }

            providers.push(Arc::new(Provider::new(ProviderId(index), def.clone())));
        }

        Ok(Self {
            providers,
            by_key,
            creatable: creatable.clone(),
        })
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Option<&Arc<Provider>> {
        self.by_key.get(key).map(|&index| &self.providers[index])
    }

    pub(crate) fn providers(&self) -> &[Arc<Provider>] {
        &self.providers
    }

    pub(crate) fn creatable(&self, id: TypeId) -> Option<&Creatable> {
        self.creatable.get(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.providers.len()
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn keys(&self) -> impl Iterator<Item = (&Key, &Arc<Provider>)> {
        self.by_key.iter().map(move |(k, &i)| (k, &self.providers[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_def<T: Send + Sync + 'static>(value: T) -> ProviderDef {
        ProviderDef::new(
            TypeTag::of::<T>(),
            Lifetime::Singleton,
            Production::Value(Arc::new(value)),
        )
    }

    #[test]
    fn first_registered_wins_without_primary() {
        let defs = vec![static_def(1u32), static_def(2u32)];
        let registry = Registry::freeze(&defs, &Map::default()).unwrap();
        assert_eq!(registry.get(&Key::of::<u32>()).unwrap().id, ProviderId(0));
    }

    #[test]
    fn latest_primary_wins() {
        let mut a = static_def(1u32);
        a.primary = true;
        let b = static_def(2u32);
        let mut c = static_def(3u32);
        c.primary = true;
        let registry = Registry::freeze(&[a, b, c], &Map::default()).unwrap();
        assert_eq!(registry.get(&Key::of::<u32>()).unwrap().id, ProviderId(2));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut a = static_def(1u32);
        a.add_name(Key::named("x"));
        let mut b = static_def(2u64);
        b.add_name(Key::named("x"));
        match Registry::freeze(&[a, b], &Map::default()) {
            Err(DiError::DuplicateName { name, existing, duplicate }) => {
                assert_eq!(name, "x");
                assert_eq!(existing, "u32");
                assert_eq!(duplicate, "u64");
            }
            _ => panic!("expected DuplicateName"),
        }
    }

    #[test]
    fn structural_errors_fail_freeze() {
        let mut no_keys = static_def(1u8);
        no_keys.remove_own_type_key();
        assert!(matches!(
            Registry::freeze(&[no_keys], &Map::default()),
            Err(DiError::InvalidArgument(_))
        ));

        let mut transient_static = static_def(1u8);
        transient_static.lifetime = Lifetime::Transient;
        assert!(Registry::freeze(&[transient_static], &Map::default()).is_err());
    }

    #[test]
    fn kind_follows_production_and_lifetime() {
        assert_eq!(static_def(1u8).kind(), ProviderKind::Static);
        let factory = ctor(|_| Ok(Arc::new(1u8) as AnyArc));
        let mut def = ProviderDef::new(TypeTag::of::<u8>(), Lifetime::Transient, Production::Factory(factory));
        assert_eq!(def.kind(), ProviderKind::TransientFactory);
        def.custom = true;
        assert_eq!(def.kind(), ProviderKind::CustomFactory);
    }
}
