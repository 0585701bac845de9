//! Per-resolution bookkeeping for cycle breaking.
//!
//! The outermost resolve call on a thread opens a context for its container;
//! nested resolutions reuse it and it is discarded when the outermost call
//! returns. Each provider visited in the context is either *constructing*
//! (its production step is running) or *built* (an instance exists, possibly
//! still being injected).
//!
//! Singletons finished inside a context are only handed to the container's
//! cache by the outermost scope, and only if nothing in the context failed.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::registration::{AnyArc, Map, ProviderId};

thread_local! {
    static ACTIVE: RefCell<Map<usize, ResolveState>> = RefCell::new(Map::default());
}

#[derive(Default)]
struct ResolveState {
    nesting: usize,
    entries: Map<ProviderId, Entry>,
    path: Vec<&'static str>,
    finished: Vec<(ProviderId, AnyArc)>,
    failed: bool,
}

enum Entry {
    Constructing,
    Built(AnyArc),
}

/// What the active context knows about a provider.
pub(crate) enum Visit {
    /// Not seen yet in this resolution
    Fresh,
    /// Production step still running: re-entering it is a cycle
    Constructing,
    /// Instance available, return it as is
    Built(AnyArc),
}

/// Guard for one (possibly nested) resolve call against one container.
pub(crate) struct ResolveScope {
    container: usize,
}

impl ResolveScope {
    pub(crate) fn enter(container: usize) -> Self {
        ACTIVE.with(|active| {
            active.borrow_mut().entry(container).or_default().nesting += 1;
        });
        Self { container }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ResolveState) -> R) -> R {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            let state = active.entry(self.container).or_default();
            f(state)
        })
    }

    pub(crate) fn visit(&self, id: ProviderId) -> Visit {
        self.with_state(|state| match state.entries.get(&id) {
            None => Visit::Fresh,
            Some(Entry::Constructing) => Visit::Constructing,
            Some(Entry::Built(instance)) => Visit::Built(instance.clone()),
        })
    }

    /// Marks `id` as constructing and pushes it on the resolution path.
    pub(crate) fn begin(&self, id: ProviderId, name: &'static str, max_depth: usize) -> DiResult<()> {
        self.with_state(|state| {
            if state.path.len() >= max_depth {
                return Err(DiError::DepthExceeded(max_depth));
            }
            state.path.push(name);
            state.entries.insert(id, Entry::Constructing);
            Ok(())
        })
    }

    /// Records the produced instance so later visits in this context reuse it.
    pub(crate) fn built(&self, id: ProviderId, instance: &AnyArc) {
        self.with_state(|state| {
            state.entries.insert(id, Entry::Built(instance.clone()));
        });
    }

    /// Pops the path after a successful construction.
    pub(crate) fn finish(&self) {
        self.with_state(|state| {
            state.path.pop();
        });
    }

    /// Queues a fully built singleton for the cache.
    pub(crate) fn finished_singleton(&self, id: ProviderId, instance: &AnyArc) {
        self.with_state(|state| state.finished.push((id, instance.clone())));
    }

    /// Pops the path and forgets the failed provider. Singletons finished
    /// earlier in this context may hold the failed instance and are never
    /// cached.
    pub(crate) fn abandon(&self, id: ProviderId) {
        self.with_state(|state| {
            state.path.pop();
            state.entries.remove(&id);
            state.failed = true;
        });
    }

    /// Singletons ready to be cached, once the outermost scope is done.
    ///
    /// Returns nothing for nested scopes and for failed contexts.
    pub(crate) fn take_finished(&self) -> Vec<(ProviderId, AnyArc)> {
        self.with_state(|state| {
            if state.nesting > 1 {
                return Vec::new();
            }
            let finished = std::mem::take(&mut state.finished);
            if state.failed {
                Vec::new()
            } else {
                finished
            }
        })
    }

    /// `Circular` error carrying the current path closed by `name`.
    pub(crate) fn circular(&self, name: &'static str) -> DiError {
        self.with_state(|state| {
            let mut path = state.path.clone();
            path.push(name);
            DiError::Circular(path)
        })
    }

    pub(crate) fn depth(&self) -> usize {
        self.with_state(|state| state.path.len())
    }
}

impl Drop for ResolveScope {
    fn drop(&mut self) {
        let _ = ACTIVE.try_with(|active| {
            let mut active = active.borrow_mut();
            let done = match active.get_mut(&self.container) {
                Some(state) => {
                    state.nesting -= 1;
                    state.nesting == 0
                }
                None => false,
            };
            if done {
                active.remove(&self.container);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn context_lives_until_outermost_scope_drops() {
        let outer = ResolveScope::enter(901);
        outer.begin(ProviderId(0), "A", 8).unwrap();
        let value: AnyArc = Arc::new(5u8);
        outer.built(ProviderId(0), &value);
        {
            let inner = ResolveScope::enter(901);
            assert!(matches!(inner.visit(ProviderId(0)), Visit::Built(_)));
        }
        assert!(matches!(outer.visit(ProviderId(0)), Visit::Built(_)));
        drop(outer);

        let fresh = ResolveScope::enter(901);
        assert!(matches!(fresh.visit(ProviderId(0)), Visit::Fresh));
    }

    #[test]
    fn constructing_entry_reports_path() {
        let scope = ResolveScope::enter(902);
        scope.begin(ProviderId(1), "A", 8).unwrap();
        scope.begin(ProviderId(2), "B", 8).unwrap();
        assert!(matches!(scope.visit(ProviderId(1)), Visit::Constructing));
        match scope.circular("A") {
            DiError::Circular(path) => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("unexpected {other:?}"),
        }
        scope.abandon(ProviderId(2));
        assert_eq!(scope.depth(), 1);
        assert!(matches!(scope.visit(ProviderId(2)), Visit::Fresh));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let scope = ResolveScope::enter(903);
        scope.begin(ProviderId(0), "A", 1).unwrap();
        assert!(matches!(
            scope.begin(ProviderId(1), "B", 1),
            Err(DiError::DepthExceeded(1))
        ));
    }

    #[test]
    fn finished_singletons_wait_for_outermost_scope() {
        let value: AnyArc = Arc::new(1u8);
        let outer = ResolveScope::enter(906);
        {
            let inner = ResolveScope::enter(906);
            inner.finished_singleton(ProviderId(3), &value);
            assert!(inner.take_finished().is_empty());
        }
        let finished = outer.take_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].0, ProviderId(3));
    }

    #[test]
    fn failure_discards_finished_singletons() {
        let value: AnyArc = Arc::new(1u8);
        let scope = ResolveScope::enter(907);
        scope.begin(ProviderId(0), "A", 8).unwrap();
        scope.begin(ProviderId(1), "B", 8).unwrap();
        scope.finished_singleton(ProviderId(1), &value);
        scope.finish();
        scope.abandon(ProviderId(0));
        assert!(scope.take_finished().is_empty());
    }

    #[test]
    fn containers_have_separate_contexts() {
        let a = ResolveScope::enter(904);
        let b = ResolveScope::enter(905);
        a.begin(ProviderId(0), "A", 8).unwrap();
        assert!(matches!(b.visit(ProviderId(0)), Visit::Fresh));
    }
}
