//! # Signalbox
//!
//! Observable values and stores with explicit subscriptions.
//!
//! Signalbox provides two levels of abstraction for change propagation:
//!
//! ## Observable values (Low-level primitives)
//!
//! - `ObservableValue<T>` - A mutable cell that notifies listeners when it changes
//! - `Subscription` - The capability that removes a listener again
//!
//! ## Stores (High-level state management)
//!
//! - `ObservableStore` - Named, heterogeneous fields behind a single owner
//! - `StoreObserver` - Non-owning handle for views that read and subscribe
//! - Per-field and store-wide notifications, with coalesced batch writes
//!
//! Everything runs synchronously on the calling thread: a write returns only
//! after every affected listener has run, and listeners always observe the
//! new value.
//!
//! The [`scope`], [`persist`] and [`dispatch`] modules wire stores to their
//! surroundings: ambient context lookup, key-value persistence, and a queue
//! for writers on other threads.

mod error;

pub mod dispatch;
pub mod observable;
pub mod persist;
pub mod scope;
pub mod store;

// Re-export main types for convenience
pub use error::{DispatchError, PersistError, ScopeError, StoreError};
pub use observable::{Listener, ObservableValue, Subscription};
pub use store::{FieldHandle, Mutation, NotifyPolicy, ObservableStore, StoreObserver, StoreOptions};
