use crate::error::{DispatchError, StoreError};
use crate::store::{Mutation, StoreObserver};
use flume::{Receiver, Sender};
use tracing::{debug, trace};

enum Envelope {
    Single(Mutation),
    Batch(Vec<Mutation>),
}

/// Cloneable, thread-safe handle for queueing writes to a store.
///
/// Queued writes are applied by the [`Dispatcher`] on whichever thread
/// drains it, one envelope at a time and in send order.
pub struct MutationSender(Sender<Envelope>);

impl Clone for MutationSender {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl MutationSender {
    pub fn send(&self, mutation: Mutation) -> Result<(), DispatchError> {
        self.enqueue(Envelope::Single(mutation))
    }

    /// Queue a write of `value` to `name`.
    pub fn set<T: Send + 'static>(&self, name: &str, value: T) -> Result<(), DispatchError> {
        self.send(Mutation::new(name, value))
    }

    /// Queue several writes to be applied as one
    /// [`batch`](crate::ObservableStore::batch).
    pub fn send_batch(
        &self,
        mutations: impl IntoIterator<Item = Mutation>,
    ) -> Result<(), DispatchError> {
        self.enqueue(Envelope::Batch(mutations.into_iter().collect()))
    }

    fn enqueue(&self, envelope: Envelope) -> Result<(), DispatchError> {
        self.0.send(envelope).map_err(|_| DispatchError::Closed)
    }
}

impl std::fmt::Debug for MutationSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationSender")
            .field("queued", &self.0.len())
            .finish()
    }
}

/// Single consumer that serializes writes from many producers.
///
/// The store itself assumes one writer at a time. Producers on other
/// threads hold a [`MutationSender`]; the thread that owns the store calls
/// [`process_pending`](Self::process_pending) or awaits [`run`](Self::run)
/// to apply what they queued.
///
/// # Example
///
/// ```
/// use signalbox::dispatch::Dispatcher;
/// use signalbox::ObservableStore;
///
/// let store = ObservableStore::new();
/// store.define_field("progress", 0_u8).unwrap();
///
/// let (dispatcher, sender) = Dispatcher::new(store.observe());
/// std::thread::spawn(move || sender.set("progress", 100_u8).unwrap())
///     .join()
///     .unwrap();
///
/// assert_eq!(dispatcher.process_pending().unwrap(), 1);
/// assert_eq!(store.get::<u8>("progress").unwrap(), 100);
/// ```
pub struct Dispatcher {
    store: StoreObserver,
    receiver: Receiver<Envelope>,
}

impl Dispatcher {
    pub fn new(store: StoreObserver) -> (Self, MutationSender) {
        let (sender, receiver) = flume::unbounded();
        (Self { store, receiver }, MutationSender(sender))
    }

    /// Number of envelopes waiting to be applied.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Apply everything queued so far on the calling thread.
    ///
    /// Stops at the first write the store rejects and returns its error;
    /// later envelopes stay queued. Returns the number of envelopes applied.
    pub fn process_pending(&self) -> Result<usize, StoreError> {
        let mut applied = 0;
        while let Ok(envelope) = self.receiver.try_recv() {
            self.apply(envelope)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Apply envelopes as they arrive until every sender is dropped.
    ///
    /// Stops early with the first error the store reports, including
    /// [`StoreError::Disposed`] once the owner has released the store.
    pub async fn run(&self) -> Result<usize, StoreError> {
        let mut applied = 0;
        while let Ok(envelope) = self.receiver.recv_async().await {
            self.apply(envelope)?;
            applied += 1;
        }
        debug!(applied, "all mutation senders dropped");
        Ok(applied)
    }

    fn apply(&self, envelope: Envelope) -> Result<usize, StoreError> {
        match envelope {
            Envelope::Single(mutation) => {
                trace!(field = mutation.name(), "applying queued mutation");
                self.store.batch([mutation])
            }
            Envelope::Batch(mutations) => {
                trace!(len = mutations.len(), "applying queued batch");
                self.store.batch(mutations)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("store", &self.store)
            .field("pending", &self.pending())
            .finish()
    }
}
