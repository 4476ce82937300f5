use super::backend::KeyValueBackend;
use crate::error::PersistError;
use crate::observable::Subscription;
use crate::store::{FieldHandle, ObservableStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, warn};

/// Binds store fields to a [`KeyValueBackend`].
///
/// A persisted field is seeded from the backend when it is defined and saved
/// back after every change.
///
/// # Example
///
/// ```
/// use signalbox::persist::{MemoryBackend, Persistence};
/// use signalbox::ObservableStore;
/// use std::sync::Arc;
///
/// let backend = Arc::new(MemoryBackend::new());
/// let persistence = Persistence::new(backend.clone()).with_prefix("settings.");
///
/// let store = ObservableStore::new();
/// let dark_mode = persistence.define_field(&store, "dark_mode", false).unwrap();
/// dark_mode.set(true).unwrap();
///
/// assert_eq!(backend.get("settings.dark_mode"), Some(serde_json::json!(true)));
/// ```
#[derive(Clone)]
pub struct Persistence {
    backend: Arc<dyn KeyValueBackend>,
    prefix: String,
}

impl Persistence {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend,
            prefix: String::new(),
        }
    }

    /// Prepend `prefix` to every field name to form its storage key.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Define `name` on `store`, seeded from the backend.
    ///
    /// A missing entry seeds `default`. An entry that does not decode as `T`
    /// also seeds `default`, with a warning. A failing backend is reported
    /// to the caller and no field is defined.
    ///
    /// Saving stops when the returned [`PersistedField`] is dropped.
    pub fn define_field<T>(
        &self,
        store: &ObservableStore,
        name: &str,
        default: T,
    ) -> Result<PersistedField<T>, PersistError>
    where
        T: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
    {
        let key = self.key_for(name);
        let initial = match self.backend.load(&key)? {
            Some(raw) => match serde_json::from_value::<T>(raw) {
                Ok(value) => {
                    debug!(key = %key, "field seeded from backend");
                    value
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "stored value does not decode, using default");
                    default
                }
            },
            None => default,
        };

        let field = store.define_field(name, initial)?;
        let subscription = field.subscribe({
            let field = field.clone();
            let backend = Arc::clone(&self.backend);
            let key = key.clone();
            move || {
                if let Err(err) = save(&field, backend.as_ref(), &key) {
                    warn!(key = %key, error = %err, "failed to persist field");
                }
            }
        })?;

        Ok(PersistedField {
            field,
            key,
            backend: Arc::clone(&self.backend),
            _subscription: subscription,
        })
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn save<T>(field: &FieldHandle<T>, backend: &dyn KeyValueBackend, key: &str) -> Result<(), PersistError>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    let value = field.with(|value| serde_json::to_value(value))??;
    backend.save(key, value)
}

/// A store field whose changes are written to a backend.
///
/// Dereferences to the underlying [`FieldHandle`].
#[must_use = "dropping a PersistedField stops saving its changes"]
pub struct PersistedField<T> {
    field: FieldHandle<T>,
    key: String,
    backend: Arc<dyn KeyValueBackend>,
    _subscription: Subscription,
}

impl<T> PersistedField<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn field(&self) -> &FieldHandle<T> {
        &self.field
    }

    /// Save the current value now, whether or not it changed.
    pub fn flush(&self) -> Result<(), PersistError> {
        save(&self.field, self.backend.as_ref(), &self.key)
    }
}

impl<T> Deref for PersistedField<T> {
    type Target = FieldHandle<T>;

    fn deref(&self) -> &Self::Target {
        &self.field
    }
}

impl<T> std::fmt::Debug for PersistedField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedField")
            .field("key", &self.key)
            .field("field", &self.field)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::persist::{MemoryBackend, MockKeyValueBackend};
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn seeds_initial_value_from_backend() {
        let mut backend = MockKeyValueBackend::new();
        backend
            .expect_load()
            .withf(|key| key == "settings.username")
            .times(1)
            .returning(|_| Ok(Some(json!("Alice"))));

        let store = ObservableStore::new();
        let persistence = Persistence::new(Arc::new(backend)).with_prefix("settings.");
        let username = persistence
            .define_field(&store, "username", "Guest".to_string())
            .unwrap();

        assert_eq!(username.get().unwrap(), "Alice");
        assert_eq!(username.key(), "settings.username");
    }

    #[test]
    fn missing_entry_seeds_default_and_saves_each_change() {
        let mut backend = MockKeyValueBackend::new();
        backend.expect_load().returning(|_| Ok(None));
        backend
            .expect_save()
            .withf(|key, value| key == "premium" && *value == json!(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let store = ObservableStore::new();
        let premium = Persistence::new(Arc::new(backend))
            .define_field(&store, "premium", false)
            .unwrap();

        assert!(!premium.get().unwrap());
        premium.set(true).unwrap();
        // Unchanged writes do not reach the backend.
        premium.set(true).unwrap();
    }

    #[test]
    fn undecodable_entry_falls_back_to_default() {
        let backend = MemoryBackend::new().with_entry("volume", json!("loud"));
        let store = ObservableStore::new();

        let volume = Persistence::new(Arc::new(backend))
            .define_field(&store, "volume", 5_u8)
            .unwrap();

        assert_eq!(volume.get().unwrap(), 5);
    }

    #[test]
    fn load_failure_is_reported_and_defines_nothing() {
        let mut backend = MockKeyValueBackend::new();
        backend
            .expect_load()
            .returning(|_| Err(PersistError::Backend("disk unavailable".to_string())));

        let store = ObservableStore::new();
        let result = Persistence::new(Arc::new(backend)).define_field(&store, "theme", 0_u8);

        assert!(matches!(result, Err(PersistError::Backend(_))));
        assert!(!store.contains("theme").unwrap());
    }

    #[test]
    fn save_failure_does_not_block_the_write() {
        let mut backend = MockKeyValueBackend::new();
        backend.expect_load().returning(|_| Ok(None));
        backend
            .expect_save()
            .times(1)
            .returning(|_, _| Err(PersistError::Backend("read-only".to_string())));

        let store = ObservableStore::new();
        let count = Persistence::new(Arc::new(backend))
            .define_field(&store, "count", 0)
            .unwrap();

        assert!(count.set(3).unwrap());
        assert_eq!(count.get().unwrap(), 3);
    }

    #[test]
    fn duplicate_name_surfaces_store_error() {
        let store = ObservableStore::new();
        store.define_field("count", 0).unwrap();

        let result = Persistence::new(Arc::new(MemoryBackend::new())).define_field(&store, "count", 0);
        assert!(matches!(
            result,
            Err(PersistError::Store(StoreError::DuplicateField { .. }))
        ));
    }

    #[test]
    fn values_survive_a_new_store() {
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        struct Profile {
            name: String,
            age: u32,
        }

        let backend = Arc::new(MemoryBackend::new());
        let persistence = Persistence::new(backend.clone());

        {
            let store = ObservableStore::new();
            let profile = persistence
                .define_field(
                    &store,
                    "profile",
                    Profile {
                        name: "Guest".to_string(),
                        age: 0,
                    },
                )
                .unwrap();
            profile
                .update(|p| {
                    p.name = "Alice".to_string();
                    p.age = 30;
                })
                .unwrap();
        }

        let store = ObservableStore::new();
        let profile = persistence
            .define_field(
                &store,
                "profile",
                Profile {
                    name: "Guest".to_string(),
                    age: 0,
                },
            )
            .unwrap();
        assert_eq!(
            profile.get().unwrap(),
            Profile {
                name: "Alice".to_string(),
                age: 30,
            }
        );
    }

    #[test]
    fn flush_writes_unchanged_value() {
        let backend = Arc::new(MemoryBackend::new());
        let store = ObservableStore::new();
        let level = Persistence::new(backend.clone())
            .define_field(&store, "level", 7_u32)
            .unwrap();

        assert!(backend.is_empty());
        level.flush().unwrap();
        assert_eq!(backend.get("level"), Some(json!(7)));
    }
}
