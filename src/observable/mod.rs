//! Single observable cells.
//!
//! This module provides the leaf building blocks:
//! - [`ObservableValue`]: a notifying mutable cell
//! - [`Subscription`]: the capability that removes one listener
//! - [`Listener`]: the callback shape shared by cells and stores

mod listener;
mod value;

pub use listener::{Listener, Subscription};
pub use value::ObservableValue;

pub(crate) use listener::ListenerSet;
pub(crate) use value::Equality;
