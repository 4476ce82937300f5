//! Serialized writes from many threads.
//!
//! Stores assume a single writer. [`Dispatcher`] funnels writes from any
//! number of [`MutationSender`]s through one queue that the owning thread
//! drains.

mod dispatcher;

pub use dispatcher::{Dispatcher, MutationSender};
