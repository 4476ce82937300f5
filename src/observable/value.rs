use super::listener::{ListenerSet, Subscription};
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) type Equality<T> = fn(&T, &T) -> bool;

struct Cell<T> {
    value: T,
    version: u64,
}

/// A mutable cell that notifies its listeners synchronously on change.
///
/// Cloning an `ObservableValue` yields another handle to the **same** cell;
/// every handle sees the same value and shares the listener list.
///
/// Cells built with [`new`](Self::new) notify only when the written value
/// differs from the current one. Cells built with
/// [`always_notify`](Self::always_notify) notify on every write, for types
/// without a meaningful equality.
pub struct ObservableValue<T> {
    cell: Arc<RwLock<Cell<T>>>,
    listeners: ListenerSet,
    equality: Option<Equality<T>>,
}

impl<T> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            listeners: self.listeners.clone(),
            equality: self.equality,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cell = self.cell.read();
        f.debug_struct("ObservableValue")
            .field("value", &cell.value)
            .field("version", &cell.version)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ObservableValue<T> {
    /// Create a cell that notifies only when its value actually changes.
    pub fn new(initial: T) -> Self {
        let eq: Equality<T> = <T as PartialEq>::eq;
        Self::with_equality(initial, Some(eq))
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableValue<T> {
    /// Create a cell that notifies on every write.
    pub fn always_notify(initial: T) -> Self {
        Self::with_equality(initial, None)
    }

    pub(crate) fn with_equality(initial: T, equality: Option<Equality<T>>) -> Self {
        Self {
            cell: Arc::new(RwLock::new(Cell {
                value: initial,
                version: 0,
            })),
            listeners: ListenerSet::new(),
            equality,
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.cell.read().value.clone()
    }

    /// Read the value with a function without cloning.
    ///
    /// The cell is read-locked while `f` runs; `f` must not write to it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.read().value)
    }

    /// Set a new value and notify listeners if it changed.
    ///
    /// Returns `true` when listeners were notified.
    pub fn set(&self, new_value: T) -> bool {
        let changed = self.replace(new_value);
        if changed {
            self.notify();
        }
        changed
    }

    /// Update the value in place and notify listeners if it changed.
    ///
    /// `f` edits a copy of the value that is written back afterwards; no
    /// lock is held while it runs, so it may read this cell.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Register a listener. It runs after every notifying write, in
    /// registration order, and observes the new value.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    /// Number of notifying writes since creation.
    pub fn version(&self) -> u64 {
        self.cell.read().version
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Assign without notifying. Returns whether the write counts as a change.
    pub(crate) fn replace(&self, new_value: T) -> bool {
        let mut cell = self.cell.write();
        if let Some(eq) = self.equality {
            if eq(&cell.value, &new_value) {
                return false;
            }
        }
        cell.value = new_value;
        cell.version += 1;
        true
    }

    pub(crate) fn notify(&self) -> usize {
        self.listeners.notify()
    }

    pub(crate) fn clear_listeners(&self) {
        self.listeners.clear();
    }
}
