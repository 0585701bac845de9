//! Internal implementation details.

pub(crate) mod resolve_context;

pub(crate) use resolve_context::{ResolveScope, Visit};
