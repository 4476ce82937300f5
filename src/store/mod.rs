//! Stores of named observable fields.
//!
//! A store aggregates heterogeneous [`ObservableValue`](crate::ObservableValue)
//! fields behind one owner, with per-field and store-wide notifications and
//! coalesced batch writes.

mod field;
mod options;
mod store;

pub use field::{FieldHandle, Mutation};
pub use options::{NotifyPolicy, StoreOptions};
pub use store::{ObservableStore, StoreObserver};
