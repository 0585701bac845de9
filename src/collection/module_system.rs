//! Service modules for grouping registrations.

use super::ContainerBuilder;
use crate::error::DiResult;

/// A group of registrations applied to a builder in one call.
///
/// # Example
///
/// ```rust
/// use ferrous_inject::{ContainerBuilder, DiResult, Resolver, ServiceModule};
///
/// #[derive(Default)]
/// struct UserConfig;
///
/// struct UserService;
///
/// struct UserModule;
///
/// impl ServiceModule for UserModule {
///     fn register_services(self, builder: &mut ContainerBuilder) -> DiResult<()> {
///         builder.register_static(UserConfig::default());
///         builder.register_transient::<UserService, _>(|r| {
///             let _config = r.get_required::<UserConfig>();
///             UserService
///         });
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut builder = ContainerBuilder::new();
/// let container = builder.add_module(UserModule)?.build()?;
/// assert!(container.get::<UserService>().is_ok());
/// # Ok(())
/// # }
/// ```
pub trait ServiceModule {
    fn register_services(self, builder: &mut ContainerBuilder) -> DiResult<()>;
}

impl ContainerBuilder {
    /// Applies a module, propagating its error.
    pub fn add_module<M: ServiceModule>(&mut self, module: M) -> DiResult<&mut Self> {
        let name = std::any::type_name::<M>();
        let before = self.pending.len();
        module.register_services(self)?;
        tracing::debug!(module = name, providers = self.pending.len() - before, "module applied");
        Ok(self)
    }
}

impl<F> ServiceModule for F
where
    F: FnOnce(&mut ContainerBuilder) -> DiResult<()>,
{
    fn register_services(self, builder: &mut ContainerBuilder) -> DiResult<()> {
        self(builder)
    }
}
