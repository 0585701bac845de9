use ferrous_inject::{ContainerBuilder, ContainerOptions, Describe, Descriptor, DiError, Resolver};
use serial_test::serial;
use std::env;

const VARS: [&str; 3] = [
    "FERROUS_INJECT_CREATE_IF_NOT_FOUND",
    "FERROUS_INJECT_EAGER_SINGLETONS",
    "FERROUS_INJECT_MAX_DEPTH",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
    env::remove_var("MYAPP_DI_MAX_DEPTH");
}

#[derive(Default)]
struct Widget;

impl Describe for Widget {
    fn describe(d: &mut Descriptor<Self>) {
        d.default_constructor();
    }
}

#[test]
#[serial]
fn defaults_without_environment() {
    clear_env();
    assert_eq!(ContainerOptions::from_env().unwrap(), ContainerOptions::default());
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    clear_env();
    env::set_var("FERROUS_INJECT_CREATE_IF_NOT_FOUND", "true");
    env::set_var("FERROUS_INJECT_EAGER_SINGLETONS", " false ");
    env::set_var("FERROUS_INJECT_MAX_DEPTH", "64");

    let options = ContainerOptions::from_env().unwrap();
    clear_env();

    assert!(options.create_if_not_found);
    assert!(!options.eager_singletons);
    assert_eq!(options.max_depth, 64);

    let mut builder = ContainerBuilder::with_options(options);
    builder.scan::<Widget>().unwrap();
    let container = builder.build().unwrap();
    assert!(container.get::<Widget>().is_ok());
}

#[test]
#[serial]
fn custom_prefix() {
    clear_env();
    env::set_var("MYAPP_DI_MAX_DEPTH", "8");
    let options = ContainerOptions::from_env_with_prefix("myapp_di").unwrap();
    clear_env();

    assert_eq!(options.max_depth, 8);
    assert!(options.eager_singletons);
}

#[test]
#[serial]
fn malformed_values_are_rejected() {
    clear_env();
    env::set_var("FERROUS_INJECT_MAX_DEPTH", "deep");
    let result = ContainerOptions::from_env();
    clear_env();

    match result {
        Err(DiError::InvalidArgument(message)) => assert!(message.contains("FERROUS_INJECT_MAX_DEPTH")),
        other => panic!("expected InvalidArgument, got {:?}", other),
    }

    env::set_var("FERROUS_INJECT_MAX_DEPTH", "0");
    let result = ContainerOptions::from_env();
    clear_env();
    assert!(matches!(result, Err(DiError::InvalidArgument(_))));
}

#[test]
fn zero_depth_is_rejected_at_build() {
    let builder = ContainerBuilder::with_options(ContainerOptions {
        max_depth: 0,
        ..ContainerOptions::default()
    });
    assert!(matches!(builder.build(), Err(DiError::InvalidArgument(_))));
}

#[test]
fn builder_exposes_options() {
    let mut builder = ContainerBuilder::new();
    builder.create_if_not_found(true);
    assert!(builder.options().create_if_not_found);

    let container = builder.build().unwrap();
    assert!(container.options().create_if_not_found);
    assert_eq!(container.options().max_depth, ferrous_inject::config::DEFAULT_MAX_DEPTH);
}

#[cfg(feature = "config")]
mod json {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_document_keeps_defaults() {
        let options = ContainerOptions::from_json(r#"{ "max_depth": 16 }"#).unwrap();
        assert_eq!(options.max_depth, 16);
        assert!(options.eager_singletons);
        assert!(!options.create_if_not_found);
    }

    #[test]
    fn invalid_documents_are_rejected() {
        assert!(matches!(
            ContainerOptions::from_json("{ not json"),
            Err(DiError::InvalidArgument(_))
        ));
        assert!(matches!(
            ContainerOptions::from_json(r#"{ "max_depth": 0 }"#),
            Err(DiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn reads_options_file() {
        let path = env::temp_dir().join(format!("ferrous-inject-options-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(br#"{ "create_if_not_found": true, "eager_singletons": false }"#)
            .unwrap();
        drop(file);

        let options = ContainerOptions::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(options.create_if_not_found);
        assert!(!options.eager_singletons);

        assert!(ContainerOptions::from_json_file(&path).is_err());
    }
}
