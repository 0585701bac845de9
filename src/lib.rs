//! # ferrous-inject
//!
//! A dependency injection container with declarative metadata, singleton and
//! transient lifetimes, cycle breaking and lazy singletons.
//!
//! ## Features
//!
//! - **Lifetimes**: singletons are built once (eagerly at `build()` unless
//!   lazy), transients once per top-level resolution
//! - **Keys**: providers are reachable by exact type, by trait views and by
//!   any number of names
//! - **Metadata scanning**: types describe their role, injection points and
//!   post-inject hooks through [`Describe`]
//! - **Cycle breaking**: mutually referencing services injected through
//!   [`Inject`] slots resolve to one shared instance each
//! - **Lazy singletons**: exposed through [`FactoryOf`] handles that resolve
//!   on demand
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_inject::{ContainerBuilder, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register_static(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! builder.register_transient::<UserService, _>(|resolver| UserService {
//!     db: resolver.get_required::<Database>(),
//! });
//!
//! let container = builder.build().unwrap();
//! let user_service = container.get_required::<UserService>();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Cycles
//!
//! ```rust
//! use ferrous_inject::{ContainerBuilder, Describe, Descriptor, Inject, Provide, Resolver};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Parent { child: Inject<Child> }
//!
//! #[derive(Default)]
//! struct Child { parent: Inject<Parent> }
//!
//! impl Describe for Parent {
//!     fn describe(d: &mut Descriptor<Self>) {
//!         d.default_constructor().service(Provide::singleton());
//!         d.inject("child", |s: &Parent| &s.child);
//!     }
//! }
//!
//! impl Describe for Child {
//!     fn describe(d: &mut Descriptor<Self>) {
//!         d.default_constructor().service(Provide::singleton());
//!         d.inject("parent", |s: &Child| &s.parent);
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.scan::<Parent>().unwrap().scan::<Child>().unwrap();
//! let container = builder.build().unwrap();
//!
//! let parent = container.get_required::<Parent>();
//! assert!(Arc::ptr_eq(parent.child.parent.get(), &parent));
//! ```
//!
//! ## Trait Resolution
//!
//! ```rust
//! use ferrous_inject::{ContainerBuilder, Resolver};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[LOG] {}", message)
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register_static_trait::<dyn Logger>(Arc::new(ConsoleLogger));
//!
//! let container = builder.build().unwrap();
//! let logger = container.get_required_trait::<dyn Logger>();
//! assert_eq!(logger.log("Hello"), "[LOG] Hello");
//! ```

pub mod collection;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod inject;
pub mod key;
pub mod lifetime;
pub mod metadata;
pub mod observer;
pub mod provider;
pub mod traits;

// Internal modules
mod internal;
mod registration;

pub use collection::{ContainerBuilder, Registration, ServiceModule};
pub use config::ContainerOptions;
pub use descriptors::ProviderDescriptor;
pub use error::{BoxError, DiError, DiResult};
pub use inject::{FactoryOf, Inject, ServiceFactory};
pub use key::{key_of_type, Key, TypeKind, TypeTag};
pub use lifetime::Lifetime;
pub use metadata::{Describe, Descriptor, PointOptions, Provide};
pub use observer::{CreatedEvent, DiObserver, TracingObserver};
pub use provider::{Container, ResolverContext};
pub use registration::{AnyArc, ProviderId, ProviderKind};
pub use traits::{Resolver, ResolverCore};
