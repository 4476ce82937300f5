use super::store::{StoreInner, StoreObserver};
use crate::error::StoreError;
use crate::observable::{Listener, ObservableValue, Subscription};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

/// Type-erased view of a field's cell, as kept in the store's map.
pub(crate) trait ErasedField: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn accepts(&self, value: &(dyn Any + Send)) -> bool;

    /// Assign without notifying. `None` if `value` has the wrong type.
    fn replace_any(&self, value: Box<dyn Any + Send>) -> Option<bool>;

    fn subscribe(&self, listener: Listener) -> Subscription;

    fn notify(&self) -> usize;

    fn clear_listeners(&self);
}

impl<T: Clone + Send + Sync + 'static> ErasedField for ObservableValue<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn accepts(&self, value: &(dyn Any + Send)) -> bool {
        value.is::<T>()
    }

    fn replace_any(&self, value: Box<dyn Any + Send>) -> Option<bool> {
        value.downcast::<T>().ok().map(|value| self.replace(*value))
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        ObservableValue::subscribe(self, move || listener())
    }

    fn notify(&self) -> usize {
        ObservableValue::notify(self)
    }

    fn clear_listeners(&self) {
        ObservableValue::clear_listeners(self)
    }
}

/// One `(field, value)` entry of a [`batch`](crate::ObservableStore::batch).
pub struct Mutation {
    pub(crate) name: String,
    pub(crate) value: Box<dyn Any + Send>,
    pub(crate) type_name: &'static str,
}

impl Mutation {
    pub fn new<T: Send + 'static>(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutation")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Typed accessor for a single store field.
///
/// Returned by [`define_field`](crate::ObservableStore::define_field). The
/// handle does not keep the store alive: once the owner disposes the store
/// every call fails with [`StoreError::Disposed`].
pub struct FieldHandle<T> {
    store: Weak<StoreInner>,
    name: Arc<str>,
    _type: PhantomData<fn() -> T>,
}

impl<T> Clone for FieldHandle<T> {
    fn clone(&self) -> Self {
        Self {
            store: Weak::clone(&self.store),
            name: Arc::clone(&self.name),
            _type: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for FieldHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldHandle")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> FieldHandle<T> {
    pub(crate) fn new(store: Weak<StoreInner>, name: &str) -> Self {
        Self {
            store,
            name: Arc::from(name),
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Result<T, StoreError> {
        self.store()?.get(&self.name)
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, StoreError> {
        self.store()?.with(&self.name, f)
    }

    pub fn set(&self, value: T) -> Result<bool, StoreError> {
        self.store()?.set(&self.name, value)
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<bool, StoreError> {
        self.store()?.update(&self.name, f)
    }

    pub fn subscribe<F>(&self, listener: F) -> Result<Subscription, StoreError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store()?.subscribe_field(&self.name, listener)
    }

    /// A non-owning handle to the store this field belongs to.
    pub fn observer(&self) -> StoreObserver {
        StoreObserver::from_weak(Weak::clone(&self.store))
    }

    fn store(&self) -> Result<Arc<StoreInner>, StoreError> {
        self.store.upgrade().ok_or(StoreError::Disposed)
    }
}
