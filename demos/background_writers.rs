//! Delayed updates from worker threads, applied on the owner thread

use signalbox::dispatch::Dispatcher;
use signalbox::{Mutation, ObservableStore};
use std::thread;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Background Writers ===\n");

    let store = ObservableStore::new();
    store.define_field("status", "Idle".to_string()).expect("fresh store");
    store.define_field("progress", 0_u8).expect("fresh store");

    let _refresh = store
        .subscribe_all({
            let observer = store.observe();
            move || {
                let status: String = observer.get("status").unwrap_or_default();
                let progress: u8 = observer.get("progress").unwrap_or_default();
                println!("   [Screen] {status} ({progress}%)");
            }
        })
        .expect("store is live");

    let (dispatcher, sender) = Dispatcher::new(store.observe());

    println!("1. Worker reports progress after simulated delays");
    let worker = thread::spawn(move || {
        sender.set("status", "Downloading".to_string()).ok();
        for progress in [25_u8, 50, 75] {
            thread::sleep(Duration::from_millis(20));
            sender.set("progress", progress).ok();
        }
        sender
            .send_batch([
                Mutation::new("status", "Done".to_string()),
                Mutation::new("progress", 100_u8),
            ])
            .ok();
    });

    println!("\n2. Owner thread drains the queue");
    match futures::executor::block_on(dispatcher.run()) {
        Ok(applied) => println!("\n   applied {applied} queued updates"),
        Err(err) => println!("\n   stopped: {err}"),
    }
    worker.join().expect("worker thread");

    println!("\n✓ Background writers complete!");
}
