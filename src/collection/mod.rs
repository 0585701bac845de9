//! Container builder for registering providers.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ContainerOptions;
use crate::descriptors::ProviderDescriptor;
use crate::error::{DiError, DiResult};
use crate::inject::ServiceFactory;
use crate::key::{Key, TypeTag};
use crate::lifetime::Lifetime;
use crate::metadata::{scanner, type_metadata, Describe};
use crate::observer::{CreatedEvent, DiObserver, Observers, OnCreated};
use crate::provider::{Container, ResolverContext};
use crate::registration::{ctor, trait_view, AnyArc, Creatable, Map, Production, ProviderDef, Registry, Set};

mod module_system;

pub use module_system::ServiceModule;

/// Staging area for provider registrations.
///
/// Registrations accumulate across calls; [`build`](Self::build) freezes a
/// snapshot into a [`Container`] and can be called again after more
/// registrations. Containers built earlier never see later registrations.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{ContainerBuilder, Key, Resolver};
/// use std::sync::Arc;
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_static(String::from("v1")).named("X").named("Y");
///
/// let container = builder.build().unwrap();
/// let by_type = container.get::<String>().unwrap();
/// let by_x = container.get_named::<String>("X").unwrap();
/// let by_y = container.get_named::<String>("Y").unwrap();
/// assert!(Arc::ptr_eq(&by_type, &by_x));
/// assert!(Arc::ptr_eq(&by_x, &by_y));
/// ```
pub struct ContainerBuilder {
    pub(crate) pending: Vec<ProviderDef>,
    pub(crate) creatable: Map<TypeId, Creatable>,
    pub(crate) scanned: Set<TypeId>,
    observers: Observers,
    options: ContainerOptions,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            pending: Vec::new(),
            creatable: Map::default(),
            scanned: Set::default(),
            observers: Observers::default(),
            options,
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    /// Lets containers build unregistered types that were scanned with a
    /// construction path, as implicit transients.
    pub fn create_if_not_found(&mut self, enabled: bool) -> &mut Self {
        self.options.create_if_not_found = enabled;
        self
    }

    fn push<T: ?Sized>(&mut self, def: ProviderDef) -> Registration<'_, T> {
        self.pending.push(def);
        let index = self.pending.len() - 1;
        Registration {
            builder: self,
            index,
            _marker: PhantomData,
        }
    }

    /// Registers a pre-built value. Always a singleton.
    pub fn register_static<T: Send + Sync + 'static>(&mut self, value: T) -> Registration<'_, T> {
        let def = ProviderDef::new(
            TypeTag::of::<T>(),
            Lifetime::Singleton,
            Production::Value(Arc::new(value)),
        );
        self.push(def)
    }

    /// Registers a pre-built trait object under `dyn I`.
    pub fn register_static_trait<I>(&mut self, value: Arc<I>) -> Registration<'_, I>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let def = ProviderDef::new(
            TypeTag::of_trait::<I>(),
            Lifetime::Singleton,
            Production::Value(Arc::new(value) as AnyArc),
        );
        self.push(def)
    }

    /// Registers a factory with an explicit lifetime.
    pub fn register_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> Registration<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        let production = ctor(move |ctx| Ok(Arc::new(factory(ctx)) as AnyArc));
        self.push(ProviderDef::new(TypeTag::of::<T>(), lifetime, Production::Factory(production)))
    }

    pub fn register_singleton<T, F>(&mut self, factory: F) -> Registration<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.register_factory(Lifetime::Singleton, factory)
    }

    pub fn register_transient<T, F>(&mut self, factory: F) -> Registration<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.register_factory(Lifetime::Transient, factory)
    }

    /// Registers a factory that can fail. Its error aborts the resolution.
    ///
    /// ```
    /// use ferrous_inject::{ContainerBuilder, DiError, Lifetime, Resolver};
    ///
    /// struct Connection;
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder
    ///     .register_fallible::<Connection, _>(Lifetime::Singleton, |_| {
    ///         Err(DiError::factory("Connection", std::io::Error::other("refused")))
    ///     })
    ///     .lazy();
    ///
    /// let container = builder.build().unwrap();
    /// assert!(matches!(container.get::<Connection>(), Err(DiError::Factory { .. })));
    /// ```
    pub fn register_fallible<T, F>(&mut self, lifetime: Lifetime, factory: F) -> Registration<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        let production = ctor(move |ctx| factory(ctx).map(|value| Arc::new(value) as AnyArc));
        self.push(ProviderDef::new(TypeTag::of::<T>(), lifetime, Production::Factory(production)))
    }

    /// Registers a factory producing a trait object under `dyn I`.
    pub fn register_trait_factory<I, F>(&mut self, lifetime: Lifetime, factory: F) -> Registration<'_, I>
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<I> + Send + Sync + 'static,
    {
        let production = ctor(move |ctx| Ok(Arc::new(factory(ctx)) as AnyArc));
        self.push(ProviderDef::new(TypeTag::of_trait::<I>(), lifetime, Production::Factory(production)))
    }

    /// Registers a singleton built through `T::default()`.
    pub fn register_auto<T>(&mut self) -> Registration<'_, T>
    where
        T: Default + Send + Sync + 'static,
    {
        let production = ctor(|_| Ok(Arc::new(T::default()) as AnyArc));
        self.push(ProviderDef::new(TypeTag::of::<T>(), Lifetime::Singleton, Production::Factory(production)))
    }

    /// Registers a user factory object.
    ///
    /// The object becomes a static singleton under its own type and `T` a
    /// transient provider whose production calls [`ServiceFactory::create`].
    pub fn register_custom_factory<T, F>(&mut self, factory: F) -> Registration<'_, T>
    where
        T: Send + Sync + 'static,
        F: ServiceFactory<T>,
    {
        let factory = Arc::new(factory);
        self.pending.push(ProviderDef::new(
            TypeTag::of::<F>(),
            Lifetime::Singleton,
            Production::Value(factory.clone()),
        ));
        let production = ctor(move |_| Ok(Arc::new(factory.create()) as AnyArc));
        let mut def = ProviderDef::new(TypeTag::of::<T>(), Lifetime::Transient, Production::Factory(production));
        def.custom = true;
        self.push(def)
    }

    /// Scans `T`'s metadata and registers what it declares.
    pub fn scan<T: Describe>(&mut self) -> DiResult<&mut Self> {
        scanner::scan_type::<T>(self, None)?;
        Ok(self)
    }

    /// Scans `T`'s metadata, using `value` in place of its construction path.
    pub fn scan_instance<T: Describe>(&mut self, value: T) -> DiResult<&mut Self> {
        scanner::scan_type::<T>(self, Some(value))?;
        Ok(self)
    }

    /// Attaches an observer to every container this builder builds.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Subscribes `f` to instance creation.
    ///
    /// ```
    /// use ferrous_inject::{ContainerBuilder, Lifetime, Resolver};
    /// use std::sync::{Arc, Mutex};
    ///
    /// struct Node;
    ///
    /// let attached = Arc::new(Mutex::new(Vec::new()));
    /// let sink = attached.clone();
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.on_created(move |event| sink.lock().unwrap().push((event.type_name, event.lifetime)));
    /// builder.register_transient::<Node, _>(|_| Node);
    ///
    /// let container = builder.build().unwrap();
    /// container.get_required::<Node>();
    /// assert_eq!(attached.lock().unwrap().len(), 1);
    /// assert_eq!(attached.lock().unwrap()[0].1, Lifetime::Transient);
    /// ```
    pub fn on_created<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&CreatedEvent<'_>) + Send + Sync + 'static,
    {
        self.add_observer(Arc::new(OnCreated(f)))
    }

    /// Descriptors of the pending providers, in registration order.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.pending.iter().map(|def| def.descriptor(None, false)).collect()
    }

    /// Validates the registrations, freezes them and builds a container.
    ///
    /// Non-lazy singletons are constructed here, in registration order,
    /// unless `eager_singletons` is off.
    pub fn build(&self) -> DiResult<Container> {
        self.options.validate()?;
        let registry = Registry::freeze(&self.pending, &self.creatable)?;
        let container = Container::new(registry, self.observers.clone(), self.options.clone());
        if self.options.eager_singletons {
            let count = container.initialize_singletons()?;
            debug!(count, "eager singletons constructed");
        }
        info!(
            providers = self.pending.len(),
            creatable = self.creatable.len(),
            "container built"
        );
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("pending", &self.pending.len())
            .field("creatable", &self.creatable.len())
            .field("scanned", &self.scanned.len())
            .field("options", &self.options)
            .finish()
    }
}

/// Step returned by the `register_*` family to refine the registration just
/// made.
///
/// ```
/// use ferrous_inject::{ContainerBuilder, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register_factory::<English, _>(Lifetime::Transient, |_| English)
///     .as_trait::<dyn Greeter, _>(|e| e as Arc<dyn Greeter>)
///     .named("greeter");
///
/// let container = builder.build().unwrap();
/// assert_eq!(container.get_trait::<dyn Greeter>().unwrap().greet(), "hello");
/// assert_eq!(container.get_named_trait::<dyn Greeter>("greeter").unwrap().greet(), "hello");
/// ```
pub struct Registration<'a, T: ?Sized> {
    builder: &'a mut ContainerBuilder,
    index: usize,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized> Registration<'_, T> {
    fn def(&mut self) -> &mut ProviderDef {
        &mut self.builder.pending[self.index]
    }

    /// Adds a name key.
    pub fn named(mut self, name: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        let name = name.into();
        let def = self.def();
        if name.is_empty() {
            def.error = Some(DiError::InvalidArgument(format!(
                "empty name registered for {}",
                def.impl_tag.name()
            )));
        } else {
            def.add_name(Key::Named(name));
        }
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.def().lifetime = lifetime;
        self
    }

    /// Defers construction of a singleton until first resolution.
    pub fn lazy(mut self) -> Self {
        self.def().lazy = true;
        self
    }

    /// Makes this provider win type-key collisions.
    pub fn primary(mut self) -> Self {
        self.def().primary = true;
        self
    }

    /// Removes the type key, leaving names and trait views.
    pub fn name_only(mut self) -> Self {
        self.def().remove_own_type_key();
        self
    }

    /// Descriptor of the registration as it stands.
    pub fn descriptor(&self) -> ProviderDescriptor {
        self.builder.pending[self.index].descriptor(None, false)
    }
}

impl<T: Send + Sync + 'static> Registration<'_, T> {
    /// Also exposes the provider under `dyn I`.
    pub fn as_trait<I, F>(mut self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.def().add_view(trait_view::<T, I, F>(cast));
        self
    }

    /// Runs `T`'s injection points and hooks on every produced instance.
    pub fn injectable(mut self) -> Self
    where
        T: Describe,
    {
        let def = self.def();
        match type_metadata::<T>() {
            Ok(metadata) => def.metadata = Some(metadata),
            Err(err) => def.error = Some(err),
        }
        self
    }
}
