use crate::error::ScopeError;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed name for a value provided through the ambient scope.
///
/// Two keys match only if both the name and the value type agree.
///
/// # Example
///
/// ```
/// use signalbox::scope::{self, ContextKey};
///
/// static THEME: ContextKey<&'static str> = ContextKey::new("theme");
///
/// let seen = scope::provide(&THEME, "dark", || scope::lookup(&THEME));
/// assert_eq!(seen, Some("dark"));
/// assert_eq!(scope::lookup(&THEME), None);
/// ```
pub struct ContextKey<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> std::fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextKey")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[derive(Clone)]
struct Binding {
    name: &'static str,
    type_id: TypeId,
    value: Arc<dyn Any + Send + Sync>,
}

impl Binding {
    fn matches<T: 'static>(&self, key: &ContextKey<T>) -> bool {
        self.name == key.name && self.type_id == TypeId::of::<T>()
    }
}

// Thread-local stack of bindings; the innermost provide is last.
thread_local! {
    static SCOPE_STACK: RefCell<Vec<Binding>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` with `key` bound to `value`.
///
/// The binding is visible to everything `f` calls on this thread, shadows
/// any outer binding of the same key, and is removed when `f` returns or
/// unwinds.
pub fn provide<T, F, R>(key: &ContextKey<T>, value: T, f: F) -> R
where
    T: Send + Sync + 'static,
    F: FnOnce() -> R,
{
    let binding = Binding {
        name: key.name,
        type_id: TypeId::of::<T>(),
        value: Arc::new(value),
    };
    with_bindings(std::iter::once(binding), f)
}

/// The innermost value bound to `key`, if any.
pub fn lookup<T: Clone + 'static>(key: &ContextKey<T>) -> Option<T> {
    SCOPE_STACK.with(|stack| {
        stack
            .borrow()
            .iter()
            .rev()
            .find(|binding| binding.matches(key))
            .and_then(|binding| binding.value.downcast_ref::<T>().cloned())
    })
}

/// Like [`lookup`], failing with [`ScopeError::Missing`] when unbound.
pub fn require<T: Clone + 'static>(key: &ContextKey<T>) -> Result<T, ScopeError> {
    lookup(key).ok_or(ScopeError::Missing { key: key.name })
}

/// Number of bindings currently in effect on this thread.
pub fn depth() -> usize {
    SCOPE_STACK.with(|stack| stack.borrow().len())
}

/// The bindings in effect at one point, detached from the thread that
/// captured them.
///
/// Use this to carry the ambient scope into a deferred callback or onto
/// another thread.
#[derive(Clone, Default)]
pub struct ScopeSnapshot {
    bindings: Vec<Binding>,
}

impl ScopeSnapshot {
    /// Capture the bindings in effect on the current thread.
    pub fn capture() -> Self {
        Self {
            bindings: SCOPE_STACK.with(|stack| stack.borrow().clone()),
        }
    }

    /// Run `f` with the captured bindings layered over the current ones.
    pub fn enter<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        with_bindings(self.bindings.iter().cloned(), f)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for ScopeSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.bindings.iter().map(|binding| binding.name))
            .finish()
    }
}

fn with_bindings<F, R>(bindings: impl Iterator<Item = Binding>, f: F) -> R
where
    F: FnOnce() -> R,
{
    let base = SCOPE_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        let base = stack.len();
        stack.extend(bindings);
        base
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    SCOPE_STACK.with(|stack| {
        stack.borrow_mut().truncate(base);
    });

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}
