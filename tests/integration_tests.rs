//! Integration tests for Signalbox

use signalbox::persist::{MemoryBackend, Persistence};
use signalbox::scope::{self, ContextKey};
use signalbox::{Mutation, ObservableStore, ObservableValue, StoreError, StoreObserver};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

fn counting_listener() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();
    (counter, move || {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn value_notifies_each_listener_once_in_order() {
    let value = ObservableValue::new(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    let _subs: Vec<_> = (0..3)
        .map(|i| {
            let order = order.clone();
            value.subscribe(move || order.lock().unwrap().push(i))
        })
        .collect();

    value.set(2);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);

    // Same value again: no further notifications
    value.set(2);
    assert_eq!(order.lock().unwrap().len(), 3);
}

#[test]
fn unsubscribed_listener_never_runs_again() {
    let value = ObservableValue::new("a".to_string());
    let (calls, listener) = counting_listener();
    let sub = value.subscribe(listener);

    value.set("b".to_string());
    sub.unsubscribe();
    sub.unsubscribe();
    value.set("c".to_string());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn counter_scenario() {
    let store = ObservableStore::new();
    store.define_field("count", 0).unwrap();
    let (refreshes, listener) = counting_listener();
    let _sub = store.subscribe_all(listener).unwrap();

    store.set("count", 1).unwrap();

    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(store.get::<i32>("count").unwrap(), 1);
}

#[test]
fn user_profile_batch_scenario() {
    let store = ObservableStore::new();
    store.define_field("username", "Guest".to_string()).unwrap();
    store.define_field("premium", false).unwrap();
    let (refreshes, listener) = counting_listener();
    let _sub = store.subscribe_all(listener).unwrap();

    store
        .batch([
            Mutation::new("username", "Alice".to_string()),
            Mutation::new("premium", true),
        ])
        .unwrap();

    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(store.get::<String>("username").unwrap(), "Alice");
    assert!(store.get::<bool>("premium").unwrap());
}

#[test]
fn duplicate_definition_scenario() {
    let store = ObservableStore::new();
    store.define_field("x", 1).unwrap();

    match store.define_field("x", 1) {
        Err(StoreError::DuplicateField { name }) => assert_eq!(name, "x"),
        other => panic!("expected DuplicateField, got {other:?}"),
    }
}

#[test]
fn field_listeners_complete_before_aggregate() {
    let store = ObservableStore::new();
    store.define_field("temperature", 20).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let _aggregate = store
        .subscribe_all({
            let log = log.clone();
            move || log.lock().unwrap().push("aggregate")
        })
        .unwrap();
    let _field = store
        .subscribe_field("temperature", {
            let log = log.clone();
            move || log.lock().unwrap().push("field")
        })
        .unwrap();

    store.set("temperature", 21).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["field", "aggregate"]);
}

#[test]
fn disposed_store_rejects_everything() {
    let store = ObservableStore::new();
    store.define_field("count", 0).unwrap();
    let observer = store.observe();
    let (calls, listener) = counting_listener();
    let _sub = store.subscribe_all(listener).unwrap();

    store.dispose();
    store.dispose();

    assert_eq!(store.get::<i32>("count"), Err(StoreError::Disposed));
    assert_eq!(store.set("count", 1), Err(StoreError::Disposed));
    assert!(matches!(
        store.subscribe_field("count", || {}),
        Err(StoreError::Disposed)
    ));
    assert_eq!(observer.get::<i32>("count"), Err(StoreError::Disposed));
    assert_eq!(
        observer.batch([Mutation::new("count", 2)]),
        Err(StoreError::Disposed)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn owner_and_observer_share_one_store() {
    // Parent view owns the store; child view only observes it.
    struct ChildView {
        store: StoreObserver,
        renders: Arc<Mutex<Vec<String>>>,
    }

    impl ChildView {
        fn render(&self) {
            let name: String = self.store.get("username").unwrap();
            self.renders.lock().unwrap().push(format!("Hello, {name}"));
        }
    }

    let parent = ObservableStore::new();
    parent.define_field("username", "Guest".to_string()).unwrap();

    let child = Arc::new(ChildView {
        store: parent.observe(),
        renders: Arc::new(Mutex::new(Vec::new())),
    });
    child.render();
    let _sub = parent
        .subscribe_all({
            let child = child.clone();
            move || child.render()
        })
        .unwrap();

    child.store.set("username", "Alice".to_string()).unwrap();

    assert_eq!(
        *child.renders.lock().unwrap(),
        vec!["Hello, Guest", "Hello, Alice"]
    );
}

#[test]
fn environment_provided_store_and_persisted_settings() {
    static SETTINGS: ContextKey<StoreObserver> = ContextKey::new("settings");

    let backend = Arc::new(MemoryBackend::new().with_entry("theme", serde_json::json!("dark")));
    let persistence = Persistence::new(backend.clone());

    let store = ObservableStore::new();
    let theme = persistence
        .define_field(&store, "theme", "light".to_string())
        .unwrap();
    assert_eq!(theme.get().unwrap(), "dark");

    fn toggle_button() {
        let settings = scope::require(&SETTINGS).unwrap();
        settings
            .update::<String>("theme", |theme| {
                *theme = if theme == "dark" { "light" } else { "dark" }.to_string();
            })
            .unwrap();
    }

    scope::provide(&SETTINGS, store.observe(), toggle_button);

    assert_eq!(theme.get().unwrap(), "light");
    assert_eq!(backend.get("theme"), Some(serde_json::json!("light")));
}
