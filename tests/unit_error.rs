/// Unit tests for DiError and DiResult types

use ferrous_inject::{DiError, DiResult};
use std::error::Error;

#[test]
fn test_error_display_not_found() {
    let error = DiError::NotFound("TestService".to_string());
    assert_eq!(error.to_string(), "Service not found: TestService");
    assert!(error.is_not_found());
}

#[test]
fn test_error_display_circular() {
    let error = DiError::Circular(vec!["ServiceA", "ServiceB", "ServiceA"]);
    assert_eq!(error.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
    assert!(!error.is_not_found());
}

#[test]
fn test_error_display_duplicate_name() {
    let error = DiError::DuplicateName {
        name: "db".to_string(),
        existing: "app::Postgres",
        duplicate: "app::Sqlite",
    };
    assert_eq!(
        error.to_string(),
        "Duplicate name \"db\": already registered by app::Postgres, registered again by app::Sqlite"
    );
}

#[test]
fn test_error_display_depth_exceeded() {
    assert_eq!(DiError::DepthExceeded(64).to_string(), "Max depth 64 exceeded");
}

#[test]
fn test_error_display_wrong_lifetime() {
    let error = DiError::WrongLifetime {
        singleton: "Cache",
        transient: "Request",
    };
    let display = error.to_string();
    assert!(display.starts_with("Lifetime error: singleton Cache cannot hold transient Request"));
    assert!(display.contains("FactoryOf"));
}

#[test]
fn test_inject_member_chains_source() {
    let error = DiError::InjectMember {
        service: "Handler",
        member: "repo",
        source: Box::new(DiError::NotFound("Repository".to_string())),
    };
    assert_eq!(error.to_string(), "Cannot inject Handler::repo: Service not found: Repository");

    let source = error.source().unwrap();
    assert_eq!(source.to_string(), "Service not found: Repository");
}

#[test]
fn test_factory_error_keeps_cause() {
    let error = DiError::factory("Pool", std::io::Error::other("timeout"));
    assert_eq!(error.to_string(), "Factory for Pool failed: timeout");
    assert_eq!(error.source().unwrap().to_string(), "timeout");

    // Clone shares the cause
    let cloned = error.clone();
    assert_eq!(cloned.to_string(), error.to_string());
}

#[test]
fn test_factory_error_from_string() {
    let error = DiError::factory("Pool", "no connections left");
    assert_eq!(error.to_string(), "Factory for Pool failed: no connections left");
}

#[test]
fn test_di_result() {
    fn lookup(found: bool) -> DiResult<u32> {
        if found {
            Ok(1)
        } else {
            Err(DiError::NotFound("u32".to_string()))
        }
    }

    assert_eq!(lookup(true).unwrap(), 1);
    assert!(matches!(lookup(false), Err(DiError::NotFound(_))));
}
