use ferrous_inject::{
    ContainerBuilder, CreatedEvent, Describe, Descriptor, DiError, DiObserver, Inject, Key, Lifetime, Provide,
    Resolver, TracingObserver,
};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Engine {
    wheel: Inject<Wheel>,
}

#[derive(Default)]
struct Wheel {
    engine: Inject<Engine>,
}

impl Describe for Engine {
    fn describe(d: &mut Descriptor<Self>) {
        d.default_constructor().service(Provide::singleton());
        d.inject("wheel", |s: &Engine| &s.wheel);
    }
}

impl Describe for Wheel {
    fn describe(d: &mut Descriptor<Self>) {
        d.default_constructor().service(Provide::singleton());
        d.inject("engine", |s: &Wheel| &s.engine);
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl DiObserver for Recorder {
    fn resolving(&self, key: &Key) {
        self.events.lock().unwrap().push(format!("resolving {}", key));
    }

    fn resolved(&self, key: &Key, _duration: Duration) {
        self.events.lock().unwrap().push(format!("resolved {}", key));
    }

    fn resolution_failed(&self, key: &Key, _error: &DiError) {
        self.events.lock().unwrap().push(format!("failed {}", key));
    }

    fn created(&self, event: &CreatedEvent<'_>) {
        self.events.lock().unwrap().push(format!("created {}", event.type_name));
    }
}

#[test]
fn created_fires_after_injection_innermost_first() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let mut builder = ContainerBuilder::new();
    builder.on_created(move |event| {
        // The instance is fully injected by the time observers see it
        if let Some(engine) = event.downcast::<Engine>() {
            assert!(engine.wheel.is_filled());
        }
        if let Some(wheel) = event.downcast::<Wheel>() {
            assert!(wheel.engine.is_filled());
        }
        sink.lock().unwrap().push(event.type_name);
    });
    builder.scan::<Engine>().unwrap().scan::<Wheel>().unwrap();
    let container = builder.build().unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![std::any::type_name::<Wheel>(), std::any::type_name::<Engine>()]
    );

    // Cache hits are silent
    container.get_required::<Engine>();
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn static_values_do_not_fire_created() {
    let recorder = Arc::new(Recorder::default());

    let mut builder = ContainerBuilder::new();
    builder.add_observer(recorder.clone());
    builder.register_static(5u8);
    builder.register_transient::<String, _>(|r| format!("{}", r.get_required::<u8>()));
    let container = builder.build().unwrap();
    assert!(recorder.take().is_empty());

    container.get_required::<String>();
    assert_eq!(
        recorder.take(),
        vec![
            "resolving alloc::string::String".to_string(),
            "resolving u8".to_string(),
            "resolved u8".to_string(),
            "created alloc::string::String".to_string(),
            "resolved alloc::string::String".to_string(),
        ]
    );
}

#[test]
fn failures_are_reported() {
    let recorder = Arc::new(Recorder::default());

    let mut builder = ContainerBuilder::new();
    builder.add_observer(recorder.clone());
    let container = builder.build().unwrap();

    assert!(container.get_named::<u8>("missing").is_err());
    assert_eq!(
        recorder.take(),
        vec!["resolving \"missing\"".to_string(), "failed \"missing\"".to_string()]
    );
}

#[test]
fn created_event_carries_provider_details() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let mut builder = ContainerBuilder::new();
    builder.on_created(move |event| sink.lock().unwrap().push((event.provider.index(), event.lifetime)));
    builder.register_static(1u8);
    builder.register_transient::<u16, _>(|_| 2);
    let container = builder.build().unwrap();

    container.get_required::<u16>();
    assert_eq!(*seen.lock().unwrap(), vec![(1, Lifetime::Transient)]);
}

// ===== tracing =====

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn tracing_observer_logs_events() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut builder = ContainerBuilder::new();
        builder.add_observer(Arc::new(TracingObserver::new()));
        builder.register_transient::<String, _>(|_| "hello".to_string());
        let container = builder.build().unwrap();

        container.get_required::<String>();
        let _ = container.get::<u32>();
    });

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("container built"));
    assert!(output.contains("instance created"));
    assert!(output.contains("resolution failed"));
    assert!(output.contains("alloc::string::String"));
}
