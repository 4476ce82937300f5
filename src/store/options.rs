/// When a field write produces notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
    /// Notify only when the new value differs from the current one.
    #[default]
    OnChange,
    /// Notify on every write, even when the value is unchanged.
    Always,
}

/// Configuration for an [`ObservableStore`](crate::ObservableStore).
///
/// # Example
///
/// ```
/// use signalbox::{NotifyPolicy, ObservableStore, StoreOptions};
///
/// let store = ObservableStore::with_options(
///     StoreOptions::new()
///         .with_label("settings")
///         .with_notify_policy(NotifyPolicy::Always),
/// );
/// assert_eq!(store.options().label(), "settings");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    label: String,
    notify_policy: NotifyPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            label: "store".to_string(),
            notify_policy: NotifyPolicy::default(),
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name attached to the store's tracing events.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Policy applied to fields defined with
    /// [`define_field`](crate::ObservableStore::define_field).
    #[must_use]
    pub fn with_notify_policy(mut self, policy: NotifyPolicy) -> Self {
        self.notify_policy = policy;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn notify_policy(&self) -> NotifyPolicy {
        self.notify_policy
    }
}
