//! Error types for stores, scopes, persistence and dispatch.

use thiserror::Error;

/// Failures reported by [`ObservableStore`](crate::ObservableStore) and
/// [`StoreObserver`](crate::StoreObserver).
///
/// All variants are local and recoverable: the store is left exactly as it
/// was before the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("field '{name}' is already defined")]
    DuplicateField { name: String },

    #[error("field '{name}' is not defined")]
    UnknownField { name: String },

    #[error("store has been disposed")]
    Disposed,

    /// The field exists but holds a different type than the one requested.
    #[error("field '{name}' does not hold a value of type {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },
}

impl StoreError {
    pub(crate) fn unknown(name: &str) -> Self {
        Self::UnknownField {
            name: name.to_string(),
        }
    }

    pub(crate) fn mismatch<T>(name: &str) -> Self {
        Self::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        }
    }
}

/// Failure to resolve a value from the ambient scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("no value provided for context key '{key}'")]
    Missing { key: &'static str },
}

/// Failures raised by a [`KeyValueBackend`](crate::persist::KeyValueBackend)
/// or while encoding values for it.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("backend error. reason: {0}")]
    Backend(String),

    #[error("codec error. cause: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure to enqueue a mutation with a [`Dispatcher`](crate::dispatch::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatcher has shut down")]
    Closed,
}
