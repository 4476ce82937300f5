use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// A change callback.
///
/// Listeners take no arguments; they re-read whatever they depend on.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Slots {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Ordered set of listeners shared by a cell or a store.
///
/// Insertion order is notification order.
#[derive(Clone, Default)]
pub(crate) struct ListenerSet {
    slots: Arc<Mutex<Slots>>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, listener: Listener) -> Subscription {
        let id = {
            let mut slots = self.slots.lock();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, listener));
            id
        };

        Subscription {
            id,
            slots: Arc::downgrade(&self.slots),
        }
    }

    /// Invoke every listener registered at the moment of the call.
    ///
    /// The list is snapshotted first and no lock is held while a listener
    /// runs, so listeners may subscribe, unsubscribe or mutate re-entrantly.
    /// Listeners added during the pass wait for the next one; listeners
    /// removed before their turn are skipped.
    pub(crate) fn notify(&self) -> usize {
        let snapshot: Vec<(u64, Listener)> = self.slots.lock().entries.clone();

        let mut invoked = 0;
        for (id, listener) in snapshot {
            if !self.contains(id) {
                continue;
            }
            listener();
            invoked += 1;
        }
        invoked
    }

    pub(crate) fn clear(&self) {
        self.slots.lock().entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    fn contains(&self, id: u64) -> bool {
        self.slots.lock().entries.iter().any(|(entry, _)| *entry == id)
    }
}

/// Capability that removes exactly one listener.
///
/// Unsubscribing is idempotent. Dropping the subscription unsubscribes as
/// well; call [`detach`](Self::detach) to keep the listener registered for
/// as long as its source lives.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    slots: Weak<Mutex<Slots>>,
}

impl Subscription {
    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(slots) = self.slots.upgrade() {
            slots.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }

    /// Whether the listener is still registered with a live source.
    pub fn is_active(&self) -> bool {
        self.slots
            .upgrade()
            .map(|slots| slots.lock().entries.iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }

    /// Give up the capability, leaving the listener registered.
    pub fn detach(mut self) {
        self.slots = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn unsubscribe_twice_is_noop() {
        let set = ListenerSet::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let first = set.add(counting(&calls));
        let _second = set.add(counting(&calls));

        first.unsubscribe();
        first.unsubscribe();
        assert_eq!(set.len(), 1);

        set.notify();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_unsubscribes_but_detach_does_not() {
        let set = ListenerSet::new();
        let calls = Arc::new(AtomicUsize::new(0));

        drop(set.add(counting(&calls)));
        assert_eq!(set.len(), 0);

        set.add(counting(&calls)).detach();
        assert_eq!(set.len(), 1);
        assert_eq!(set.notify(), 1);
    }

    #[test]
    fn listener_added_during_pass_waits_for_next_pass() {
        let set = ListenerSet::new();
        let late_calls = Arc::new(AtomicUsize::new(0));

        let set_clone = set.clone();
        let late = counting(&late_calls);
        set.add(Arc::new(move || {
            set_clone.add(Arc::clone(&late)).detach();
        }))
        .detach();

        assert_eq!(set.notify(), 1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        set.notify();
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_removed_mid_pass_is_skipped() {
        let set = ListenerSet::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let victim_clone = Arc::clone(&victim);
        set.add(Arc::new(move || {
            if let Some(sub) = victim_clone.lock().take() {
                sub.unsubscribe();
            }
        }))
        .detach();
        *victim.lock() = Some(set.add(counting(&calls)));

        assert_eq!(set.notify(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscription_outliving_source_is_inert() {
        let set = ListenerSet::new();
        let sub = set.add(Arc::new(|| {}));
        drop(set);

        assert!(!sub.is_active());
        sub.unsubscribe();
    }
}
