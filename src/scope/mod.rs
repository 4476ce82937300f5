//! Ambient, subtree-scoped context.
//!
//! Values are provided for the duration of a closure and looked up by typed
//! key from anything that closure calls, without threading them through
//! parameters. Bindings are per thread; use [`ScopeSnapshot`] to carry them
//! across threads.

mod context;

pub use context::{depth, lookup, provide, require, ContextKey, ScopeSnapshot};
