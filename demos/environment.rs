//! Environment-style values reachable from nested views

use signalbox::scope::{self, ContextKey, ScopeSnapshot};
use signalbox::{ObservableStore, StoreObserver};

static SESSION: ContextKey<StoreObserver> = ContextKey::new("session");
static ACCENT: ContextKey<&'static str> = ContextKey::new("accent");

fn root_view() {
    println!("   [Root] accent = {}", scope::lookup(&ACCENT).unwrap_or("default"));
    scope::provide(&ACCENT, "orange", detail_view);
    profile_badge();
}

fn detail_view() {
    println!("   [Detail] accent = {}", scope::lookup(&ACCENT).unwrap_or("default"));
    profile_badge();
}

fn profile_badge() {
    match scope::require(&SESSION) {
        Ok(session) => {
            let name: String = session.get("username").unwrap_or_default();
            println!("   [Badge] signed in as {name}");
        }
        Err(err) => println!("   [Badge] {err}"),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Environment Values ===\n");

    let session = ObservableStore::new();
    session
        .define_field("username", "Alice".to_string())
        .expect("fresh store");

    println!("1. Outside any scope");
    profile_badge();

    println!("\n2. Provided at the root, overridden in a subtree");
    scope::provide(&SESSION, session.observe(), || {
        scope::provide(&ACCENT, "blue", root_view);
    });

    println!("\n3. Captured and replayed on a worker thread");
    let snapshot = scope::provide(&SESSION, session.observe(), ScopeSnapshot::capture);
    std::thread::spawn(move || snapshot.enter(profile_badge))
        .join()
        .expect("worker thread");

    println!("\n✓ Environment demo complete!");
}
