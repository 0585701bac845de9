/// Tests for the modular registration system
///
/// Verifies that both `ServiceModule` implementations and plain closures can
/// organize registrations, and that module errors propagate.

use ferrous_inject::{
    ContainerBuilder, Describe, Descriptor, DiError, DiResult, Inject, Provide, Resolver, ServiceModule,
};
use std::sync::Arc;

// ===== Test Services =====

#[derive(Debug, Clone)]
struct Config {
    name: String,
    value: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "test-config".to_string(),
            value: 42,
        }
    }
}

struct DatabaseService {
    config: Arc<Config>,
    connection_id: String,
}

impl DatabaseService {
    fn new(config: Arc<Config>) -> Self {
        Self {
            connection_id: format!("conn-{}", config.value),
            config,
        }
    }

    fn get_data(&self) -> String {
        format!("Data from {} ({})", self.config.name, self.connection_id)
    }
}

#[derive(Default)]
struct UserService {
    db: Inject<DatabaseService>,
}

impl Describe for UserService {
    fn describe(d: &mut Descriptor<Self>) {
        d.default_constructor().service(Provide::singleton());
        d.inject("db", |s: &UserService| &s.db);
    }
}

// ===== Modules =====

struct CoreModule;

impl ServiceModule for CoreModule {
    fn register_services(self, builder: &mut ContainerBuilder) -> DiResult<()> {
        builder.register_static(Config::default());
        builder.register_singleton::<DatabaseService, _>(|r| DatabaseService::new(r.get_required::<Config>()));
        Ok(())
    }
}

struct UserModule;

impl ServiceModule for UserModule {
    fn register_services(self, builder: &mut ContainerBuilder) -> DiResult<()> {
        builder.scan::<UserService>()?;
        Ok(())
    }
}

struct BrokenModule;

#[derive(Default)]
struct Broken;

impl Describe for Broken {
    fn describe(d: &mut Descriptor<Self>) {
        d.default_constructor().service(Provide::singleton()).configuration();
    }
}

impl ServiceModule for BrokenModule {
    fn register_services(self, builder: &mut ContainerBuilder) -> DiResult<()> {
        builder.register_static(1u8);
        builder.scan::<Broken>()?;
        Ok(())
    }
}

#[test]
fn test_modules_compose() {
    let mut builder = ContainerBuilder::new();
    let container = builder
        .add_module(CoreModule)
        .unwrap()
        .add_module(UserModule)
        .unwrap()
        .build()
        .unwrap();

    let users = container.get_required::<UserService>();
    assert_eq!(users.db.get_data(), "Data from test-config (conn-42)");
    assert!(Arc::ptr_eq(users.db.get(), &container.get_required::<DatabaseService>()));
}

#[test]
fn test_closure_module() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_module(|b: &mut ContainerBuilder| -> DiResult<()> {
            b.register_static(Config {
                name: "closure".into(),
                value: 7,
            })
            .named("config");
            Ok(())
        })
        .unwrap();

    let container = builder.build().unwrap();
    let config = container.get_named::<Config>("config").unwrap();
    assert_eq!(config.name, "closure");
    assert_eq!(config.value, 7);
}

#[test]
fn test_module_error_propagates() {
    let mut builder = ContainerBuilder::new();
    let result = builder.add_module(BrokenModule);
    assert!(matches!(result, Err(DiError::InvalidMetadata { .. })));

    // Registrations made before the failure stay in the builder
    assert_eq!(builder.descriptors().len(), 1);
}
