//! Settings screen backed by persisted key-value storage

use serde::{Deserialize, Serialize};
use signalbox::persist::{MemoryBackend, Persistence};
use signalbox::{Mutation, ObservableStore};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Theme {
    Light,
    Dark,
}

fn open_settings(persistence: &Persistence) {
    let store = ObservableStore::new();
    let username = persistence
        .define_field(&store, "username", "Guest".to_string())
        .expect("username field");
    let premium = persistence
        .define_field(&store, "premium", false)
        .expect("premium field");
    let theme = persistence
        .define_field(&store, "theme", Theme::Light)
        .expect("theme field");

    let _refresh = store
        .subscribe_all({
            let observer = store.observe();
            move || {
                let name: String = observer.get("username").unwrap_or_default();
                let premium: bool = observer.get("premium").unwrap_or_default();
                println!("   [Settings] user = {name}, premium = {premium}");
            }
        })
        .expect("store is live");

    println!(
        "   loaded: user = {}, premium = {}, theme = {:?}",
        username.get().unwrap_or_default(),
        premium.get().unwrap_or_default(),
        theme.get().unwrap_or(Theme::Light),
    );

    if username.get().as_deref() == Ok("Guest") {
        println!("   signing in (one refresh for two fields)");
        store
            .batch([
                Mutation::new("username", "Alice".to_string()),
                Mutation::new("premium", true),
            ])
            .expect("batch");
        theme.set(Theme::Dark).expect("theme");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Settings Screen ===\n");

    let backend = Arc::new(MemoryBackend::new());
    let persistence = Persistence::new(backend.clone()).with_prefix("settings.");

    println!("1. First launch");
    open_settings(&persistence);

    println!("\n2. Backend contents");
    for key in ["settings.username", "settings.premium", "settings.theme"] {
        println!("   {key} = {:?}", backend.get(key));
    }

    println!("\n3. Second launch restores saved values");
    open_settings(&persistence);

    println!("\n✓ Settings screen complete!");
}
