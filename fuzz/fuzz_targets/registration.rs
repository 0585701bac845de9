#![no_main]

use ferrous_inject::{ContainerBuilder, DiError, Key, Lifetime, Resolver};
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;

struct Value(u8);

fuzz_target!(|data: &[u8]| {
    let mut builder = ContainerBuilder::new();
    let mut names = HashSet::new();
    let mut duplicate = false;
    let mut invalid = false;

    for chunk in data.chunks(3).take(64) {
        let op = chunk[0];
        let arg = chunk.get(1).copied().unwrap_or(0);
        let name = format!("n{}", chunk.get(2).copied().unwrap_or(0) % 16);

        let registration = if op & 1 == 0 {
            builder.register_static(Value(arg))
        } else {
            builder.register_factory::<Value, _>(
                if op & 2 == 0 { Lifetime::Singleton } else { Lifetime::Transient },
                move |_| Value(arg),
            )
        };
        let registration = if op & 4 != 0 {
            duplicate |= !names.insert(name.clone());
            registration.named(name)
        } else {
            registration
        };
        let registration = if op & 8 != 0 { registration.primary() } else { registration };
        if op & 16 != 0 {
            invalid |= op & 1 == 1 && op & 2 != 0;
            registration.lazy();
        }
    }

    match builder.build() {
        Ok(container) => {
            assert!(!duplicate && !invalid);
            for name in &names {
                assert!(container.get_named::<Value>(name).is_ok());
            }
            assert_eq!(container.contains(&Key::of::<Value>(), None), !builder.descriptors().is_empty());
        }
        Err(DiError::DuplicateName { .. }) => assert!(duplicate),
        Err(DiError::InvalidArgument(_)) => assert!(invalid),
        Err(other) => panic!("unexpected build error: {}", other),
    }
});
