//! Persisted fields.
//!
//! The storage itself is external: anything implementing
//! [`KeyValueBackend`] can back a [`Persistence`] binding. [`MemoryBackend`]
//! is a process-local implementation for tests and demos.

mod backend;
mod persisted;

pub use backend::{KeyValueBackend, MemoryBackend};
pub use persisted::{PersistedField, Persistence};

#[cfg(test)]
pub(crate) use backend::MockKeyValueBackend;
