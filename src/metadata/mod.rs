//! Declarative registration metadata.
//!
//! A type describes itself once through [`Describe`]: how it is constructed,
//! which role it plays (plain service, configuration holder or custom
//! factory), which of its fields are injection points and which hooks run
//! after injection. The scanner turns that table into providers.

pub(crate) mod scanner;

use std::any::{type_name, TypeId};
use std::borrow::Cow;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::collection::ContainerBuilder;
use crate::error::{BoxError, DiError, DiResult};
use crate::inject::{convert_sized, convert_trait, FactoryOf, Inject, ServiceFactory};
use crate::key::{Key, TypeTag};
use crate::lifetime::Lifetime;
use crate::provider::{ContainerInner, ResolverContext};
use crate::registration::{ctor, trait_view, AnyArc, Production, ProviderDef, Target, View};
use crate::traits::Resolver;

/// Metadata table of a type.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{ContainerBuilder, Describe, Descriptor, FactoryOf, Inject, Provide, Resolver};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Clock;
///
/// #[derive(Default)]
/// struct Scheduler {
///     clock: Inject<Clock>,
///     jobs: FactoryOf<Vec<String>>,
/// }
///
/// impl Describe for Clock {
///     fn describe(d: &mut Descriptor<Self>) {
///         d.default_constructor().service(Provide::singleton());
///     }
/// }
///
/// impl Describe for Scheduler {
///     fn describe(d: &mut Descriptor<Self>) {
///         d.default_constructor().service(Provide::singleton().named("scheduler"));
///         d.inject("clock", |s: &Scheduler| &s.clock);
///         d.inject_factory("jobs", |s: &Scheduler| &s.jobs);
///         d.scan::<Clock>();
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_transient::<Vec<String>, _>(|_| vec!["backup".to_string()]);
/// builder.scan::<Scheduler>().unwrap();
/// let container = builder.build().unwrap();
///
/// let scheduler = container.get_named::<Scheduler>("scheduler").unwrap();
/// assert!(Arc::ptr_eq(scheduler.clock.get(), &container.get_required::<Clock>()));
/// assert_eq!(scheduler.jobs.get().unwrap()[0], "backup");
/// ```
pub trait Describe: Sized + Send + Sync + 'static {
    fn describe(d: &mut Descriptor<Self>);
}

type TypedCtor<S> = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<S> + Send + Sync>;
type FillValue = Arc<dyn Fn(&Target, AnyArc) -> DiResult<()> + Send + Sync>;
type FillFactory = Arc<dyn Fn(&Target, Weak<ContainerInner>, Key) -> DiResult<()> + Send + Sync>;
type IsFilled = Arc<dyn Fn(&Target) -> bool + Send + Sync>;
type HookFn = Arc<dyn Fn(&Target) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type ScanFn = fn(&mut ContainerBuilder) -> DiResult<()>;

#[derive(Clone)]
pub(crate) enum Fill {
    /// Resolve now and assign
    Value(FillValue),
    /// Bind a `FactoryOf` handle, resolve later
    Factory(FillFactory),
}

/// One dependency slot of a type.
#[derive(Clone)]
pub(crate) struct InjectionPoint {
    pub(crate) member: &'static str,
    pub(crate) key: Key,
    pub(crate) optional: bool,
    /// Representation the slot expects (`T` or `dyn Trait`)
    pub(crate) target: TypeId,
    pub(crate) fill: Fill,
    pub(crate) is_filled: IsFilled,
}

#[derive(Clone)]
pub(crate) struct Hook {
    pub(crate) name: &'static str,
    pub(crate) run: HookFn,
}

/// Injection points and hooks of one type, base members first.
pub(crate) struct TypeMetadata {
    pub(crate) type_name: &'static str,
    pub(crate) points: Vec<InjectionPoint>,
    pub(crate) hooks: Vec<Hook>,
}

impl TypeMetadata {
    pub(crate) fn is_empty(&self) -> bool {
        self.points.is_empty() && self.hooks.is_empty()
    }
}

/// Builds the injection metadata of `S` without looking at its role.
pub(crate) fn type_metadata<S: Describe>() -> DiResult<Arc<TypeMetadata>> {
    let mut descriptor = Descriptor::<S>::new();
    S::describe(&mut descriptor);
    descriptor.metadata()
}

pub(crate) enum Role<S> {
    Service(Provide<S>),
    Configuration,
    Factory(ProviderDef),
}

impl<S> Role<S> {
    fn label(&self) -> &'static str {
        match self {
            Role::Service(_) => "service",
            Role::Configuration => "configuration",
            Role::Factory(_) => "factory",
        }
    }
}

/// Registration options for a service, member or factory product.
///
/// ```rust
/// use ferrous_inject::{Lifetime, Provide};
///
/// let options = Provide::<String>::transient().named("greeting");
/// assert_eq!(options.lifetime_of(), Lifetime::Transient);
/// ```
pub struct Provide<T: ?Sized> {
    lifetime: Lifetime,
    names: Vec<Cow<'static, str>>,
    lazy: bool,
    primary: bool,
    name_only: bool,
    views: Vec<View>,
    injectable: Option<fn() -> DiResult<Arc<TypeMetadata>>>,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized> Provide<T> {
    pub fn new() -> Self {
        Self {
            lifetime: Lifetime::Singleton,
            names: Vec::new(),
            lazy: false,
            primary: false,
            name_only: false,
            views: Vec::new(),
            injectable: None,
            _marker: PhantomData,
        }
    }

    pub fn singleton() -> Self {
        Self::new()
    }

    pub fn transient() -> Self {
        Self::new().lifetime(Lifetime::Transient)
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn lifetime_of(&self) -> Lifetime {
        self.lifetime
    }

    /// Adds a name key.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Defers construction of a singleton until first resolution.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Makes this provider win type-key collisions.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Registers under the names only, not under the type.
    pub fn name_only(mut self) -> Self {
        self.name_only = true;
        self
    }

    pub(crate) fn has_names(&self) -> bool {
        !self.names.is_empty()
    }

    /// Copies these options onto a pending provider.
    pub(crate) fn apply(self, def: &mut ProviderDef) -> DiResult<()> {
        let type_name = def.impl_tag.name();
        if self.lazy && self.lifetime == Lifetime::Transient {
            return Err(DiError::metadata(type_name, "lazy applies only to singletons"));
        }
        def.lifetime = self.lifetime;
        def.lazy = self.lazy;
        def.primary = self.primary;
        for name in self.names {
            if name.is_empty() {
                return Err(DiError::metadata(type_name, "empty service name"));
            }
            def.add_name(Key::Named(name));
        }
        for view in self.views {
            def.add_view(view);
        }
        if self.name_only {
            def.remove_own_type_key();
        }
        if let Some(metadata) = self.injectable {
            def.metadata = Some(metadata()?);
        }
        Ok(())
    }
}

impl<T: Send + Sync + 'static> Provide<T> {
    /// Also exposes the provider under `dyn I`.
    pub fn as_trait<I, F>(mut self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.views.push(trait_view::<T, I, F>(cast));
        self
    }

    /// Runs `T`'s injection points and hooks on every produced instance.
    pub fn injectable(mut self) -> Self
    where
        T: Describe,
    {
        self.injectable = Some(type_metadata::<T>);
        self
    }
}

impl<T: ?Sized> Default for Provide<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Options of the injection point just declared.
pub struct PointOptions<'a> {
    point: &'a mut InjectionPoint,
    errors: &'a mut Vec<DiError>,
    type_name: &'static str,
}

impl PointOptions<'_> {
    /// Resolves the slot by name instead of by type.
    pub fn named(self, name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        if name.is_empty() {
            self.errors.push(DiError::metadata(
                self.type_name,
                format!("empty name on injection point {}", self.point.member),
            ));
        }
        self.point.key = Key::Named(name);
        self
    }

    /// Leaves the slot empty when its key is not registered.
    pub fn optional(self) -> Self {
        self.point.optional = true;
        self
    }
}

fn downcast_target<S: 'static>(target: &Target) -> DiResult<&S> {
    target
        .downcast_ref::<S>()
        .ok_or_else(|| DiError::mismatch(type_name::<S>(), "a different type"))
}

/// Collects the metadata of one type. Handed to [`Describe::describe`].
pub struct Descriptor<S> {
    pub(crate) constructor: Option<TypedCtor<S>>,
    pub(crate) roles: Vec<Role<S>>,
    pub(crate) members: Vec<ProviderDef>,
    base_points: Vec<InjectionPoint>,
    points: Vec<InjectionPoint>,
    base_hooks: Vec<Hook>,
    hooks: Vec<Hook>,
    pub(crate) scans: Vec<ScanFn>,
    errors: Vec<DiError>,
}

impl<S: Describe> Descriptor<S> {
    pub(crate) fn new() -> Self {
        Self {
            constructor: None,
            roles: Vec::new(),
            members: Vec::new(),
            base_points: Vec::new(),
            points: Vec::new(),
            base_hooks: Vec::new(),
            hooks: Vec::new(),
            scans: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Construction path with access to other services.
    pub fn constructor<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&ResolverContext<'_>) -> S + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(move |ctx: &ResolverContext<'_>| Ok(f(ctx))));
        self
    }

    /// Fallible construction path.
    pub fn try_constructor<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&ResolverContext<'_>) -> DiResult<S> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(f));
        self
    }

    /// Constructs through `Default`.
    pub fn default_constructor(&mut self) -> &mut Self
    where
        S: Default,
    {
        self.constructor = Some(Arc::new(|_: &ResolverContext<'_>| Ok(S::default())));
        self
    }

    /// Plain service role.
    pub fn service(&mut self, options: Provide<S>) -> &mut Self {
        self.roles.push(Role::Service(options));
        self
    }

    /// Configuration holder role: every `provide` member becomes a provider.
    pub fn configuration(&mut self) -> &mut Self {
        self.roles.push(Role::Configuration);
        self
    }

    /// Custom factory role: `S` becomes a singleton and `T` a provider whose
    /// production calls `S::create`.
    pub fn factory<T>(&mut self, options: Provide<T>) -> &mut Self
    where
        S: ServiceFactory<T>,
        T: Send + Sync + 'static,
    {
        let production = ctor(|ctx| {
            let factory = ctx.get::<S>()?;
            Ok(Arc::new(factory.create()) as AnyArc)
        });
        let mut def = ProviderDef::new(TypeTag::of::<T>(), Lifetime::Singleton, Production::Factory(production));
        def.custom = true;
        if let Err(err) = options.apply(&mut def) {
            self.errors.push(err);
        }
        self.roles.push(Role::Factory(def));
        self
    }

    /// Configuration member. Registered under `U` plus the explicit names,
    /// or the member name when none is given.
    pub fn provide<U, F>(&mut self, member: &'static str, options: Provide<U>, f: F) -> &mut Self
    where
        U: Send + Sync + 'static,
        F: Fn(&S) -> U + Send + Sync + 'static,
    {
        let production = ctor(move |ctx| {
            let holder = ctx.get::<S>()?;
            Ok(Arc::new(f(&*holder)) as AnyArc)
        });
        let def = ProviderDef::new(TypeTag::of::<U>(), Lifetime::Singleton, Production::Factory(production));
        self.push_member(member, options, def)
    }

    /// Configuration member producing a trait object.
    pub fn provide_trait<I, F>(&mut self, member: &'static str, options: Provide<I>, f: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&S) -> Arc<I> + Send + Sync + 'static,
    {
        let production = ctor(move |ctx| {
            let holder = ctx.get::<S>()?;
            Ok(Arc::new(f(&*holder)) as AnyArc)
        });
        let def = ProviderDef::new(TypeTag::of_trait::<I>(), Lifetime::Singleton, Production::Factory(production));
        self.push_member(member, options, def)
    }

    fn push_member<U: ?Sized>(&mut self, member: &'static str, options: Provide<U>, mut def: ProviderDef) -> &mut Self {
        let default_name = !options.has_names();
        if let Err(err) = options.apply(&mut def) {
            self.errors.push(err);
        }
        if default_name {
            def.add_name(Key::named(member));
        }
        self.members.push(def);
        self
    }

    /// Injection point resolved by `U`'s type key.
    pub fn inject<U, F>(&mut self, member: &'static str, accessor: F) -> PointOptions<'_>
    where
        U: Send + Sync + 'static,
        F: Fn(&S) -> &Inject<U> + Send + Sync + 'static,
    {
        let accessor = Arc::new(accessor);
        let check = accessor.clone();
        self.push_point(InjectionPoint {
            member,
            key: Key::of::<U>(),
            optional: false,
            target: TypeId::of::<U>(),
            fill: Fill::Value(Arc::new(move |target: &Target, value: AnyArc| {
                let service = downcast_target::<S>(target)?;
                accessor(service).fill(convert_sized::<U>(value)?);
                Ok(())
            })),
            is_filled: Arc::new(move |target: &Target| {
                target.downcast_ref::<S>().map_or(false, |s| check(s).is_filled())
            }),
        })
    }

    /// Injection point resolved by the `dyn I` type key.
    pub fn inject_trait<I, F>(&mut self, member: &'static str, accessor: F) -> PointOptions<'_>
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&S) -> &Inject<I> + Send + Sync + 'static,
    {
        let accessor = Arc::new(accessor);
        let check = accessor.clone();
        self.push_point(InjectionPoint {
            member,
            key: Key::of_trait::<I>(),
            optional: false,
            target: TypeId::of::<I>(),
            fill: Fill::Value(Arc::new(move |target: &Target, value: AnyArc| {
                let service = downcast_target::<S>(target)?;
                accessor(service).fill(convert_trait::<I>(value)?);
                Ok(())
            })),
            is_filled: Arc::new(move |target: &Target| {
                target.downcast_ref::<S>().map_or(false, |s| check(s).is_filled())
            }),
        })
    }

    /// Factory-of point: binds a handle, constructs nothing.
    pub fn inject_factory<U, F>(&mut self, member: &'static str, accessor: F) -> PointOptions<'_>
    where
        U: Send + Sync + 'static,
        F: Fn(&S) -> &FactoryOf<U> + Send + Sync + 'static,
    {
        let accessor = Arc::new(accessor);
        let check = accessor.clone();
        let target = TypeId::of::<U>();
        self.push_point(InjectionPoint {
            member,
            key: Key::of::<U>(),
            optional: false,
            target,
            fill: Fill::Factory(Arc::new(move |service: &Target, container, key| {
                let service = downcast_target::<S>(service)?;
                accessor(service).bind(container, key, target, convert_sized::<U>);
                Ok(())
            })),
            is_filled: Arc::new(move |target: &Target| {
                target.downcast_ref::<S>().map_or(false, |s| check(s).is_bound())
            }),
        })
    }

    /// Factory-of point over a trait object.
    pub fn inject_trait_factory<I, F>(&mut self, member: &'static str, accessor: F) -> PointOptions<'_>
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&S) -> &FactoryOf<I> + Send + Sync + 'static,
    {
        let accessor = Arc::new(accessor);
        let check = accessor.clone();
        let target = TypeId::of::<I>();
        self.push_point(InjectionPoint {
            member,
            key: Key::of_trait::<I>(),
            optional: false,
            target,
            fill: Fill::Factory(Arc::new(move |service: &Target, container, key| {
                let service = downcast_target::<S>(service)?;
                accessor(service).bind(container, key, target, convert_trait::<I>);
                Ok(())
            })),
            is_filled: Arc::new(move |target: &Target| {
                target.downcast_ref::<S>().map_or(false, |s| check(s).is_bound())
            }),
        })
    }

    fn push_point(&mut self, point: InjectionPoint) -> PointOptions<'_> {
        self.points.push(point);
        let index = self.points.len() - 1;
        PointOptions {
            point: &mut self.points[index],
            errors: &mut self.errors,
            type_name: type_name::<S>(),
        }
    }

    /// Hook run after all slots are filled.
    pub fn post_inject<F>(&mut self, name: &'static str, hook: F) -> &mut Self
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.hooks.push(Hook {
            name,
            run: Arc::new(move |target: &Target| {
                hook(downcast_target::<S>(target)?);
                Ok(())
            }),
        });
        self
    }

    /// Fallible hook; an error aborts the resolution.
    pub fn try_post_inject<F, E>(&mut self, name: &'static str, hook: F) -> &mut Self
    where
        F: Fn(&S) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.hooks.push(Hook {
            name,
            run: Arc::new(move |target: &Target| hook(downcast_target::<S>(target)?).map_err(Into::into)),
        });
        self
    }

    /// Inherits the injection points and hooks of `B`, reached through
    /// `accessor`. Inherited members run before the type's own.
    pub fn extends<B, F>(&mut self, accessor: F) -> &mut Self
    where
        B: Describe,
        F: Fn(&S) -> &B + Send + Sync + 'static,
    {
        let mut base = Descriptor::<B>::new();
        B::describe(&mut base);
        self.errors.append(&mut base.errors);
        self.scans.append(&mut base.scans);

        let accessor = Arc::new(accessor);
        let (points, hooks) = base.take_injection();
        for point in points {
            self.base_points.push(rebase_point::<S, B, F>(point, accessor.clone()));
        }
        for hook in hooks {
            let through = accessor.clone();
            let run = hook.run;
            self.base_hooks.push(Hook {
                name: hook.name,
                run: Arc::new(move |target: &Target| run(through(downcast_target::<S>(target)?))),
            });
        }
        self
    }

    /// Scans `U` as well when this type is scanned.
    pub fn scan<U: Describe>(&mut self) -> &mut Self {
        self.scans.push(scanner::scan_directive::<U>);
        self
    }

    fn take_injection(&mut self) -> (Vec<InjectionPoint>, Vec<Hook>) {
        let mut points = std::mem::take(&mut self.base_points);
        points.append(&mut self.points);
        let mut hooks = std::mem::take(&mut self.base_hooks);
        hooks.append(&mut self.hooks);
        (points, hooks)
    }

    /// Validates injection metadata and freezes it.
    pub(crate) fn metadata(&mut self) -> DiResult<Arc<TypeMetadata>> {
        if let Some(err) = self.errors.first() {
            return Err(err.clone());
        }
        let (points, hooks) = self.take_injection();
        let mut seen = HashSet::new();
        for point in &points {
            if !seen.insert(point.member) {
                return Err(DiError::metadata(
                    type_name::<S>(),
                    format!("member {} is injected twice", point.member),
                ));
            }
        }
        Ok(Arc::new(TypeMetadata {
            type_name: type_name::<S>(),
            points,
            hooks,
        }))
    }

    /// Role rules checked by the scanner. `by_instance` is true for
    /// `scan_instance`, where the value replaces the construction path.
    pub(crate) fn check_roles(&self, by_instance: bool) -> DiResult<()> {
        let name = type_name::<S>();
        if self.roles.len() > 1 {
            let labels: Vec<_> = self.roles.iter().map(Role::label).collect();
            return Err(DiError::metadata(
                name,
                format!("mutually exclusive roles declared: {}", labels.join(", ")),
            ));
        }
        let role = self.roles.first();
        if !self.members.is_empty() && !matches!(role, Some(Role::Configuration)) {
            return Err(DiError::metadata(
                name,
                "member providers require the configuration role",
            ));
        }
        if role.is_some() && !by_instance && self.constructor.is_none() {
            return Err(DiError::metadata(
                name,
                format!("{} role without a construction path", role.map_or("", Role::label)),
            ));
        }
        if by_instance {
            if let Some(Role::Service(options)) = role {
                if options.lifetime_of() == Lifetime::Transient {
                    return Err(DiError::metadata(name, "a scanned instance is always a singleton"));
                }
            }
        }
        Ok(())
    }
}

fn rebase_point<S, B, F>(point: InjectionPoint, accessor: Arc<F>) -> InjectionPoint
where
    S: 'static,
    B: Send + Sync + 'static,
    F: Fn(&S) -> &B + Send + Sync + 'static,
{
    let through = accessor.clone();
    let is_filled = point.is_filled;
    let fill = match point.fill {
        Fill::Value(fill) => Fill::Value(Arc::new(move |target: &Target, value: AnyArc| {
            fill(through(downcast_target::<S>(target)?), value)
        })),
        Fill::Factory(fill) => Fill::Factory(Arc::new(move |target: &Target, container, key| {
            fill(through(downcast_target::<S>(target)?), container, key)
        })),
    };
    InjectionPoint {
        member: point.member,
        key: point.key,
        optional: point.optional,
        target: point.target,
        fill,
        is_filled: Arc::new(move |target: &Target| {
            target.downcast_ref::<S>().map_or(false, |s| is_filled(accessor(s)))
        }),
    }
}
