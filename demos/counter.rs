//! Counter screen: a parent owns the state, a child view is bound to it

use signalbox::{ObservableStore, ObservableValue, StoreObserver};
use std::sync::Arc;

/// Child view that only observes the parent's store.
struct StepperView {
    store: StoreObserver,
}

impl StepperView {
    fn render(&self) {
        let count: i32 = self.store.get("count").unwrap_or_default();
        let step: i32 = self.store.get("step").unwrap_or(1);
        println!("   [Stepper] count = {count:>3}  (step {step})");
    }

    fn tap_increment(&self) {
        let step: i32 = self.store.get("step").unwrap_or(1);
        self.store.update::<i32>("count", |count| *count += step).ok();
    }

    fn tap_decrement(&self) {
        let step: i32 = self.store.get("step").unwrap_or(1);
        self.store.update::<i32>("count", |count| *count -= step).ok();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Counter Screen ===\n");

    // Local, view-private state: a single cell
    println!("1. Local state with ObservableValue");
    let is_editing = ObservableValue::new(false);
    let _editing_sub = is_editing.subscribe({
        let is_editing = is_editing.clone();
        move || println!("   [Toolbar] editing = {}", is_editing.get())
    });
    is_editing.set(true);
    is_editing.set(true); // unchanged, nothing printed
    is_editing.set(false);

    // Owned store shared with a child view
    println!("\n2. Parent owns the store");
    let store = ObservableStore::new();
    store.define_field("count", 0).expect("fresh store");
    let step = store.define_field("step", 1).expect("fresh store");

    let child = Arc::new(StepperView {
        store: store.observe(),
    });
    child.render();

    let _refresh = store
        .subscribe_all({
            let child = child.clone();
            move || child.render()
        })
        .expect("store is live");

    println!("\n3. Child writes through its binding");
    child.tap_increment();
    child.tap_increment();

    println!("\n4. Parent changes the step to 5");
    step.set(5).expect("store is live");
    child.tap_increment();
    child.tap_decrement();

    println!("\n5. Parent disposes the store");
    store.dispose();
    println!("   child sees disposed store: {}", child.store.is_disposed());

    println!("\n✓ Counter screen complete!");
}
