use super::field::{ErasedField, FieldHandle, Mutation};
use super::options::{NotifyPolicy, StoreOptions};
use crate::error::StoreError;
use crate::observable::{Equality, ListenerSet, ObservableValue, Subscription};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

#[derive(Default)]
struct StoreState {
    disposed: bool,
    order: Vec<String>,
    fields: HashMap<String, Arc<dyn ErasedField>>,
}

/// Shared state behind the owner and every observer.
pub(crate) struct StoreInner {
    options: StoreOptions,
    state: RwLock<StoreState>,
    aggregate: ListenerSet,
}

impl StoreInner {
    fn new(options: StoreOptions) -> Self {
        Self {
            options,
            state: RwLock::new(StoreState::default()),
            aggregate: ListenerSet::new(),
        }
    }

    fn define<T>(
        self: &Arc<Self>,
        name: &str,
        initial: T,
        equality: Option<Equality<T>>,
    ) -> Result<FieldHandle<T>, StoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut state = self.state.write();
        if state.disposed {
            return Err(StoreError::Disposed);
        }
        if state.fields.contains_key(name) {
            return Err(StoreError::DuplicateField {
                name: name.to_string(),
            });
        }

        let cell = ObservableValue::with_equality(initial, equality);
        state.fields.insert(name.to_string(), Arc::new(cell));
        state.order.push(name.to_string());
        debug!(
            store = %self.options.label(),
            field = name,
            ty = std::any::type_name::<T>(),
            "field defined"
        );

        Ok(FieldHandle::new(Arc::downgrade(self), name))
    }

    fn erased(&self, name: &str) -> Result<Arc<dyn ErasedField>, StoreError> {
        let state = self.state.read();
        if state.disposed {
            return Err(StoreError::Disposed);
        }
        state
            .fields
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::unknown(name))
    }

    fn cell<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<ObservableValue<T>, StoreError> {
        self.erased(name)?
            .as_any()
            .downcast_ref::<ObservableValue<T>>()
            .cloned()
            .ok_or_else(|| StoreError::mismatch::<T>(name))
    }

    pub(crate) fn get<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Result<T, StoreError> {
        Ok(self.cell::<T>(name)?.get())
    }

    pub(crate) fn with<T, R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> Result<R, StoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        Ok(self.cell::<T>(name)?.with(f))
    }

    pub(crate) fn set<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
        value: T,
    ) -> Result<bool, StoreError> {
        let cell = self.cell::<T>(name)?;
        let changed = cell.replace(value);
        if changed {
            trace!(store = %self.options.label(), field = name, "field changed");
            cell.notify();
            self.aggregate.notify();
        }
        Ok(changed)
    }

    pub(crate) fn update<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
        f: impl FnOnce(&mut T),
    ) -> Result<bool, StoreError> {
        // The cell notifies its own listeners before returning.
        let changed = self.cell::<T>(name)?.update(f);
        if changed {
            trace!(store = %self.options.label(), field = name, "field updated");
            self.aggregate.notify();
        }
        Ok(changed)
    }

    pub(crate) fn subscribe_field<F>(&self, name: &str, listener: F) -> Result<Subscription, StoreError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Ok(self.erased(name)?.subscribe(Arc::new(listener)))
    }

    pub(crate) fn subscribe_all<F>(&self, listener: F) -> Result<Subscription, StoreError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.is_disposed() {
            return Err(StoreError::Disposed);
        }
        Ok(self.aggregate.add(Arc::new(listener)))
    }

    pub(crate) fn batch(&self, mutations: Vec<Mutation>) -> Result<usize, StoreError> {
        let resolved = {
            let state = self.state.read();
            if state.disposed {
                return Err(StoreError::Disposed);
            }
            let mut resolved = Vec::with_capacity(mutations.len());
            for mutation in mutations {
                let field = state
                    .fields
                    .get(&mutation.name)
                    .cloned()
                    .ok_or_else(|| StoreError::unknown(&mutation.name))?;
                if !field.accepts(mutation.value.as_ref()) {
                    return Err(StoreError::TypeMismatch {
                        name: mutation.name,
                        expected: mutation.type_name,
                    });
                }
                resolved.push((field, mutation));
            }
            resolved
        };

        // Fields in order of first mutation, whether or not that write changed them.
        let mut touched: Vec<(String, Arc<dyn ErasedField>, bool)> = Vec::new();
        for (field, mutation) in resolved {
            let Mutation { name, value, .. } = mutation;
            let changed = field.replace_any(value) == Some(true);
            match touched.iter().position(|(n, _, _)| *n == name) {
                Some(index) => touched[index].2 |= changed,
                None => touched.push((name, field, changed)),
            }
        }

        let mut notified = 0;
        for (name, field, _) in touched.iter().filter(|(_, _, changed)| *changed) {
            trace!(store = %self.options.label(), field = %name, "field changed in batch");
            field.notify();
            notified += 1;
        }
        if notified > 0 {
            self.aggregate.notify();
        }
        Ok(notified)
    }

    pub(crate) fn contains(&self, name: &str) -> Result<bool, StoreError> {
        let state = self.state.read();
        if state.disposed {
            return Err(StoreError::Disposed);
        }
        Ok(state.fields.contains_key(name))
    }

    pub(crate) fn field_names(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state.read();
        if state.disposed {
            return Err(StoreError::Disposed);
        }
        Ok(state.order.clone())
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.read().disposed
    }

    fn dispose(&self) -> bool {
        let fields = {
            let mut state = self.state.write();
            if state.disposed {
                return false;
            }
            state.disposed = true;
            state.order.clear();
            std::mem::take(&mut state.fields)
        };

        for field in fields.values() {
            field.clear_listeners();
        }
        self.aggregate.clear();
        debug!(store = %self.options.label(), fields = fields.len(), "store disposed");
        true
    }
}

/// A named collection of observable fields, held by its owner.
///
/// The store is **owned** by whoever created it: only the owner can
/// [`dispose`](Self::dispose) it, and dropping the owner disposes it. Any
/// number of [`StoreObserver`]s may read, write and subscribe without
/// affecting its lifetime.
///
/// Every mutation notifies the mutated field's listeners first and then the
/// store-wide (aggregate) listeners, synchronously on the calling thread.
///
/// # Example
///
/// ```
/// use signalbox::ObservableStore;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let store = ObservableStore::new();
/// store.define_field("count", 0).unwrap();
///
/// let refreshes = Arc::new(AtomicUsize::new(0));
/// let _sub = store
///     .subscribe_all({
///         let refreshes = refreshes.clone();
///         move || {
///             refreshes.fetch_add(1, Ordering::SeqCst);
///         }
///     })
///     .unwrap();
///
/// store.set("count", 1).unwrap();
/// assert_eq!(store.get::<i32>("count").unwrap(), 1);
/// assert_eq!(refreshes.load(Ordering::SeqCst), 1);
/// ```
pub struct ObservableStore {
    inner: Arc<StoreInner>,
}

impl Default for ObservableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservableStore {
    /// Create an empty store with default options.
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        debug!(store = %options.label(), "store created");
        Self {
            inner: Arc::new(StoreInner::new(options)),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    /// Register a new field.
    ///
    /// Under [`NotifyPolicy::OnChange`] writes of an equal value are silent.
    pub fn define_field<T>(&self, name: &str, initial: T) -> Result<FieldHandle<T>, StoreError>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let eq: Equality<T> = <T as PartialEq>::eq;
        let equality = match self.inner.options.notify_policy() {
            NotifyPolicy::OnChange => Some(eq),
            NotifyPolicy::Always => None,
        };
        self.inner.define(name, initial, equality)
    }

    /// Register a field whose type has no equality; every write notifies.
    pub fn define_field_always_notify<T>(
        &self,
        name: &str,
        initial: T,
    ) -> Result<FieldHandle<T>, StoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner.define(name, initial, None)
    }

    /// A non-owning handle to this store.
    pub fn observe(&self) -> StoreObserver {
        StoreObserver::from_weak(Arc::downgrade(&self.inner))
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Result<T, StoreError> {
        self.inner.get(name)
    }

    pub fn with<T, R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> Result<R, StoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner.with(name, f)
    }

    /// Write a field. Returns `true` when listeners were notified.
    pub fn set<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
        value: T,
    ) -> Result<bool, StoreError> {
        self.inner.set(name, value)
    }

    /// Mutate a field in place. `f` edits a copy and may read the store.
    pub fn update<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
        f: impl FnOnce(&mut T),
    ) -> Result<bool, StoreError> {
        self.inner.update(name, f)
    }

    pub fn subscribe_field<F>(&self, name: &str, listener: F) -> Result<Subscription, StoreError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.subscribe_field(name, listener)
    }

    pub fn subscribe_all<F>(&self, listener: F) -> Result<Subscription, StoreError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.subscribe_all(listener)
    }

    /// Apply several writes as one change.
    ///
    /// Every entry is validated before anything is written; an unknown field
    /// or a wrongly typed value rejects the whole batch. Field listeners then
    /// run once per changed field, in order of first mutation, and aggregate
    /// listeners run exactly once. Returns the number of changed fields.
    ///
    /// Each write is compared with the value before it, not with the value
    /// the field held when the batch started. A field written away and back
    /// to its original value within one batch counts as changed.
    pub fn batch(&self, mutations: impl IntoIterator<Item = Mutation>) -> Result<usize, StoreError> {
        self.inner.batch(mutations.into_iter().collect())
    }

    pub fn contains(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.contains(name)
    }

    /// Field names in definition order.
    pub fn field_names(&self) -> Result<Vec<String>, StoreError> {
        self.inner.field_names()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Drop every field and listener. Later operations fail with
    /// [`StoreError::Disposed`]. Calling this again is a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Drop for ObservableStore {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl std::fmt::Debug for ObservableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableStore")
            .field("label", &self.inner.options.label())
            .field("fields", &self.inner.field_names().unwrap_or_default())
            .field("disposed", &self.inner.is_disposed())
            .finish()
    }
}

/// A non-owning handle to an [`ObservableStore`].
///
/// Observers read, write and subscribe exactly like the owner but cannot
/// dispose the store or define fields, and do not keep it alive.
#[derive(Clone)]
pub struct StoreObserver {
    inner: Weak<StoreInner>,
}

impl StoreObserver {
    pub(crate) fn from_weak(inner: Weak<StoreInner>) -> Self {
        Self { inner }
    }

    fn inner(&self) -> Result<Arc<StoreInner>, StoreError> {
        self.inner.upgrade().ok_or(StoreError::Disposed)
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Result<T, StoreError> {
        self.inner()?.get(name)
    }

    pub fn with<T, R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> Result<R, StoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner()?.with(name, f)
    }

    pub fn set<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
        value: T,
    ) -> Result<bool, StoreError> {
        self.inner()?.set(name, value)
    }

    pub fn update<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
        f: impl FnOnce(&mut T),
    ) -> Result<bool, StoreError> {
        self.inner()?.update(name, f)
    }

    pub fn subscribe_field<F>(&self, name: &str, listener: F) -> Result<Subscription, StoreError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner()?.subscribe_field(name, listener)
    }

    pub fn subscribe_all<F>(&self, listener: F) -> Result<Subscription, StoreError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner()?.subscribe_all(listener)
    }

    pub fn batch(&self, mutations: impl IntoIterator<Item = Mutation>) -> Result<usize, StoreError> {
        self.inner()?.batch(mutations.into_iter().collect())
    }

    pub fn contains(&self, name: &str) -> Result<bool, StoreError> {
        self.inner()?.contains(name)
    }

    pub fn field_names(&self) -> Result<Vec<String>, StoreError> {
        self.inner()?.field_names()
    }

    /// Whether the owner has disposed (or dropped) the store.
    pub fn is_disposed(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.is_disposed())
            .unwrap_or(true)
    }
}

impl std::fmt::Debug for StoreObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreObserver")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
