#![no_main]

use ferrous_inject::{ContainerBuilder, ContainerOptions, DiError, Lifetime, Resolver};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const NODES: usize = 8;

struct Node {
    children: Vec<Arc<Node>>,
}

fuzz_target!(|data: &[u8]| {
    if data.len() < NODES {
        return;
    }

    let mut builder = ContainerBuilder::with_options(ContainerOptions {
        eager_singletons: false,
        max_depth: 32,
        ..ContainerOptions::default()
    });

    // One byte per node: low bit picks the lifetime, the rest is an edge mask
    for (index, &byte) in data[..NODES].iter().enumerate() {
        let lifetime = if byte & 1 == 0 { Lifetime::Singleton } else { Lifetime::Transient };
        let edges: Vec<String> = (1..NODES)
            .filter(|bit| byte & (1 << bit) != 0)
            .map(|bit| format!("node{}", (index + bit) % NODES))
            .collect();
        builder
            .register_fallible::<Node, _>(lifetime, move |r| {
                let children = edges
                    .iter()
                    .map(|name| r.get_named::<Node>(name))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node { children })
            })
            .named(format!("node{}", index))
            .name_only();
    }

    let container = match builder.build() {
        Ok(container) => container,
        Err(err) => panic!("build failed: {}", err),
    };

    for &byte in &data[NODES..] {
        let name = format!("node{}", byte as usize % NODES);
        match container.get_named::<Node>(&name) {
            Ok(node) => {
                assert!(node.children.len() < NODES);
                if data[byte as usize % NODES] & 1 == 0 {
                    let again = container.get_named::<Node>(&name).unwrap();
                    assert!(Arc::ptr_eq(&node, &again));
                }
            }
            Err(DiError::Circular(path)) => assert!(path.len() >= 2),
            Err(DiError::DepthExceeded(depth)) => assert_eq!(depth, 32),
            Err(other) => panic!("unexpected resolution error: {}", other),
        }
    }
});
