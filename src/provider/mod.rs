//! The container: resolution, lifetimes and cycle breaking.

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, trace};

use crate::config::ContainerOptions;
use crate::descriptors::ProviderDescriptor;
use crate::error::{DiError, DiResult};
use crate::inject::{convert_sized, convert_trait, FactoryOf};
use crate::internal::{ResolveScope, Visit};
use crate::key::{Key, TypeTag};
use crate::lifetime::Lifetime;
use crate::metadata::{type_metadata, Describe, TypeMetadata};
use crate::observer::{CreatedEvent, Observers};
use crate::registration::{AnyArc, Map, Production, Provider, ProviderDef, ProviderId, Registry};
use crate::traits::{Resolver, ResolverCore};

pub mod context;
pub(crate) mod injector;

pub use context::ResolverContext;

static NEXT_CONTAINER_ID: AtomicUsize = AtomicUsize::new(1);

/// A built dependency injection container.
///
/// Created by [`ContainerBuilder::build`](crate::ContainerBuilder::build).
/// Cloning is cheap and clones share the same providers and singleton cache.
///
/// # Thread Safety
///
/// The container is `Send + Sync`. Cached singletons are read without locking;
/// constructions are serialized per container by a re-entrant lock, so each
/// singleton is built at most once even with concurrent callers. A factory
/// must not block on another thread that resolves from the same container.
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
/// builder.register_transient::<UserService, _>(|r| UserService {
///     db: r.get_required::<Database>(),
/// });
///
/// let container = builder.build().unwrap();
/// let users = container.get_required::<UserService>();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    id: usize,
    registry: Registry,
    /// Indexed by provider id; only singleton slots are ever filled
    singletons: Box<[OnceCell<AnyArc>]>,
    /// Auto-created transients, ids continue after the registry's
    implicit: RwLock<Map<TypeId, Arc<Provider>>>,
    observers: Observers,
    options: ContainerOptions,
    resolve_lock: ReentrantMutex<()>,
    metadata_cache: RwLock<Map<TypeId, Arc<TypeMetadata>>>,
}

impl Container {
    pub(crate) fn new(registry: Registry, observers: Observers, options: ContainerOptions) -> Self {
        let singletons = (0..registry.len()).map(|_| OnceCell::new()).collect();
        Self {
            inner: Arc::new(ContainerInner {
                id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
                registry,
                singletons,
                implicit: RwLock::new(Map::default()),
                observers,
                options,
                resolve_lock: ReentrantMutex::new(()),
                metadata_cache: RwLock::new(Map::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
        Self { inner }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// Resolves `key` to an instance.
    ///
    /// Type keys return the representation of that type (`Arc<T>`, or
    /// `Arc<Arc<dyn I>>` for trait keys); name keys return the provider's
    /// own representation.
    pub fn resolve(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve_key(key, key.type_tag().map(TypeTag::id))
    }

    /// Resolves `key`, converting the instance to the view `view`.
    pub(crate) fn resolve_view(&self, key: &Key, view: TypeId) -> DiResult<AnyArc> {
        self.resolve_key(key, Some(view))
    }

    fn resolve_key(&self, key: &Key, view: Option<TypeId>) -> DiResult<AnyArc> {
        let observers = &self.inner.observers;
        let started = if observers.has_observers() {
            observers.resolving(key);
            Some(Instant::now())
        } else {
            None
        };

        let result = self.lookup(key).and_then(|provider| {
            let raw = self.instance_of(&provider)?;
            match view {
                Some(view) => provider.project(raw, view),
                None => Ok(raw),
            }
        });

        if let Some(started) = started {
            match &result {
                Ok(_) => observers.resolved(key, started.elapsed()),
                Err(err) => observers.resolution_failed(key, err),
            }
        }
        result
    }

    /// Finds the provider for `key`, falling back to an implicit transient
    /// when `create_if_not_found` is on.
    pub(crate) fn lookup(&self, key: &Key) -> DiResult<Arc<Provider>> {
        if let Some(provider) = self.inner.registry.get(key) {
            return Ok(provider.clone());
        }
        match key {
            Key::Type(tag) if self.inner.options.create_if_not_found => {
                if tag.is_abstract() {
                    return Err(DiError::InvalidArgument(format!(
                        "cannot create abstract type {}",
                        tag.name()
                    )));
                }
                self.implicit_provider(tag)
                    .ok_or_else(|| DiError::NotFound(tag.name().to_string()))
            }
            _ => Err(DiError::NotFound(key.display_name().to_string())),
        }
    }

    fn implicit_provider(&self, tag: &TypeTag) -> Option<Arc<Provider>> {
        if let Some(provider) = self.inner.implicit.read().get(&tag.id()) {
            return Some(provider.clone());
        }
        let creatable = self.inner.registry.creatable(tag.id())?;
        let mut implicit = self.inner.implicit.write();
        let id = ProviderId(self.inner.registry.len() + implicit.len());
        let provider = implicit.entry(tag.id()).or_insert_with(|| {
            let mut def = ProviderDef::new(
                creatable.tag,
                Lifetime::Transient,
                Production::Factory(creatable.ctor.clone()),
            );
            if !creatable.metadata.is_empty() {
                def.metadata = Some(creatable.metadata.clone());
            }
            debug!(type_name = creatable.tag.name(), provider = %id, "auto-created transient provider");
            Arc::new(Provider::new(id, def))
        });
        Some(provider.clone())
    }

    fn singleton_cell(&self, provider: &Provider) -> Option<&OnceCell<AnyArc>> {
        if provider.lifetime().is_singleton() {
            self.inner.singletons.get(provider.id.index())
        } else {
            None
        }
    }

    /// Returns the provider's raw instance, constructing it if needed.
    pub(crate) fn instance_of(&self, provider: &Provider) -> DiResult<AnyArc> {
        let cell = self.singleton_cell(provider);
        if let Some(instance) = cell.and_then(OnceCell::get) {
            return Ok(instance.clone());
        }

        let _guard = self.inner.resolve_lock.lock();
        let scope = ResolveScope::enter(self.inner.id);
        if let Some(instance) = cell.and_then(OnceCell::get) {
            return Ok(instance.clone());
        }

        match scope.visit(provider.id) {
            Visit::Built(instance) => {
                trace!(type_name = provider.name(), "returning in-progress instance");
                return Ok(instance);
            }
            Visit::Constructing => return Err(scope.circular(provider.name())),
            Visit::Fresh => {}
        }

        scope.begin(provider.id, provider.name(), self.inner.options.max_depth)?;
        let result = match self.construct(provider, &scope) {
            Ok(instance) => {
                scope.finish();
                if cell.is_some() {
                    scope.finished_singleton(provider.id, &instance);
                }
                Ok(instance)
            }
            Err(err) => {
                scope.abandon(provider.id);
                Err(err)
            }
        };
        self.commit(&scope);
        result
    }

    /// Caches the singletons of a context whose outermost call is returning.
    fn commit(&self, scope: &ResolveScope) {
        for (id, instance) in scope.take_finished() {
            if let Some(cell) = self.inner.singletons.get(id.index()) {
                let _ = cell.set(instance);
            }
        }
    }

    fn construct(&self, provider: &Provider, scope: &ResolveScope) -> DiResult<AnyArc> {
        let ctx = ResolverContext::new(self);
        let instance = provider.produce(&ctx)?;
        scope.built(provider.id, &instance);

        if let Some(metadata) = &provider.def.metadata {
            injector::inject(self, &*instance, metadata, Some(provider))?;
        }

        if !provider.is_static() {
            debug!(
                type_name = provider.name(),
                lifetime = ?provider.lifetime(),
                depth = scope.depth(),
                "constructed instance"
            );
            self.inner.observers.created(&CreatedEvent {
                lifetime: provider.lifetime(),
                type_name: provider.name(),
                provider: provider.id,
                instance: &instance,
            });
        }
        Ok(instance)
    }

    /// Constructs every non-lazy singleton in registration order.
    pub(crate) fn initialize_singletons(&self) -> DiResult<usize> {
        let mut count = 0;
        for provider in self.inner.registry.providers() {
            if provider.lifetime().is_singleton() && !provider.def.lazy {
                self.instance_of(provider)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Whether `key` resolves to a provider, optionally of the given lifetime.
    ///
    /// ```
    /// use ferrous_inject::{ContainerBuilder, Key, Lifetime};
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register_transient::<String, _>(|_| String::new()).named("text");
    /// let container = builder.build().unwrap();
    ///
    /// assert!(container.contains(&Key::named("text"), None));
    /// assert!(container.contains(&Key::of::<String>(), Some(Lifetime::Transient)));
    /// assert!(!container.contains(&Key::of::<String>(), Some(Lifetime::Singleton)));
    /// assert!(!container.contains(&Key::of::<u8>(), None));
    /// ```
    pub fn contains(&self, key: &Key, lifetime: Option<Lifetime>) -> bool {
        self.lookup(key)
            .map(|provider| lifetime.map_or(true, |l| provider.lifetime() == l))
            .unwrap_or(false)
    }

    /// Descriptor of the provider behind `key`, if any.
    pub fn try_get_provider(&self, key: &Key) -> Option<ProviderDescriptor> {
        self.lookup(key).ok().map(|provider| self.describe_provider(&provider))
    }

    /// Like [`try_get_provider`](Self::try_get_provider), failing with `NotFound`.
    pub fn get_provider(&self, key: &Key) -> DiResult<ProviderDescriptor> {
        self.lookup(key).map(|provider| self.describe_provider(&provider))
    }

    /// Descriptors of all registered providers, in registration order.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.inner
            .registry
            .providers()
            .iter()
            .map(|provider| self.describe_provider(provider))
            .collect()
    }

    fn describe_provider(&self, provider: &Provider) -> ProviderDescriptor {
        let instantiated = self
            .singleton_cell(provider)
            .map_or(false, |cell| cell.get().is_some());
        provider.def.descriptor(Some(provider.id), instantiated)
    }

    /// Fills the injection points of an object the container did not build,
    /// then runs its post-inject hooks.
    ///
    /// ```
    /// use ferrous_inject::{ContainerBuilder, Describe, Descriptor, Inject};
    ///
    /// struct Settings { verbose: bool }
    ///
    /// struct Screen { settings: Inject<Settings> }
    ///
    /// impl Describe for Screen {
    ///     fn describe(d: &mut Descriptor<Self>) {
    ///         d.inject("settings", |s: &Screen| &s.settings);
    ///     }
    /// }
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register_static(Settings { verbose: true });
    /// let container = builder.build().unwrap();
    ///
    /// let screen = Screen { settings: Inject::new() };
    /// container.inject_services(&screen).unwrap();
    /// assert!(screen.settings.verbose);
    /// ```
    pub fn inject_services<T: Describe>(&self, target: &T) -> DiResult<()> {
        let metadata = self.metadata_for::<T>()?;
        let _guard = self.inner.resolve_lock.lock();
        let scope = ResolveScope::enter(self.inner.id);
        let result = injector::inject(self, target, &metadata, None);
        self.commit(&scope);
        result
    }

    fn metadata_for<T: Describe>(&self) -> DiResult<Arc<TypeMetadata>> {
        let id = TypeId::of::<T>();
        if let Some(metadata) = self.inner.metadata_cache.read().get(&id) {
            return Ok(metadata.clone());
        }
        let metadata = type_metadata::<T>()?;
        self.inner.metadata_cache.write().insert(id, metadata.clone());
        Ok(metadata)
    }

    /// A factory-of handle on `T`. Nothing is constructed until
    /// [`FactoryOf::get`] is called.
    pub fn factory_of<T: Send + Sync + 'static>(&self) -> DiResult<FactoryOf<T>> {
        let key = Key::of::<T>();
        self.lookup(&key)?;
        Ok(FactoryOf::bound(
            Arc::downgrade(&self.inner),
            key,
            TypeId::of::<T>(),
            convert_sized::<T>,
        ))
    }

    /// A factory-of handle on the trait object `T`.
    pub fn factory_of_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<FactoryOf<T>> {
        let key = Key::of_trait::<T>();
        self.lookup(&key)?;
        Ok(FactoryOf::bound(
            Arc::downgrade(&self.inner),
            key,
            TypeId::of::<T>(),
            convert_trait::<T>,
        ))
    }

    /// Multi-line listing of every key and the provider it resolves to.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        use std::fmt::Write;

        let mut entries: Vec<_> = self
            .inner
            .registry
            .keys()
            .map(|(key, provider)| (provider.id, key.to_string(), provider))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let mut out = String::new();
        let _ = writeln!(out, "Container #{} ({} providers)", self.inner.id, self.inner.registry.len());
        for (id, key, provider) in entries {
            let descriptor = self.describe_provider(provider);
            let _ = writeln!(
                out,
                "  {} -> {} {} {:?}{}{}",
                key,
                id,
                descriptor.impl_type_name,
                descriptor.lifetime,
                if descriptor.lazy { " lazy" } else { "" },
                if descriptor.instantiated { " (instantiated)" } else { "" },
            );
        }
        out
    }
}

impl ResolverCore for Container {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve(key)
    }

    fn resolve_as(&self, key: &Key, view: TypeId) -> DiResult<AnyArc> {
        self.resolve_view(key, view)
    }
}

impl Resolver for Container {}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("providers", &self.inner.registry.len())
            .field("observers", &self.inner.observers.len())
            .field("options", &self.inner.options)
            .finish()
    }
}
