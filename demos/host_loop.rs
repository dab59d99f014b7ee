//! # Example: host_loop
//!
//! Runs a dedicated single-threaded loop (a stand-in for a UI thread) and delivers the
//! signals of a [`PublishSubject`] on it through the host scheduler.
//!
//! ## Flow
//! ```text
//! main thread: subject.next(..) ─► observe_on(host) ─► LoopThread "ui" ─► on_next
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example host_loop
//! ```

use std::sync::mpsc;
use std::time::Duration;

use rxvisor::{LoopThread, Observable, PublishSubject, Schedulers, Subject};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // 1. Start the host loop and wrap it in a scheduler.
    let ui = LoopThread::start("ui")?;
    let host = Schedulers::host(ui.looper());

    // 2. A subject fed from the main thread, observed on the host loop.
    let subject = PublishSubject::<String>::new();
    let (done_tx, done_rx) = mpsc::channel();
    subject
        .to_observable()
        .observe_on(host.clone())
        .subscriber()
        .on_next(|s| {
            let thread = std::thread::current();
            println!("[{}] {s}", thread.name().unwrap_or("?"));
        })
        .on_complete(move || {
            let _ = done_tx.send(());
        })
        .subscribe()?;

    for word in ["hello", "from", "the", "main", "thread"] {
        subject.next(word.to_string());
    }
    subject.complete();
    done_rx.recv_timeout(Duration::from_secs(2))?;

    // 3. Delayed work on the host loop.
    let (tick_tx, tick_rx) = mpsc::channel();
    Observable::from_iter(vec![1, 2, 3])
        .delay(Duration::from_millis(100), host, false)
        .subscriber()
        .on_next(move |v| {
            let _ = tick_tx.send(v);
        })
        .subscribe()?;
    for _ in 0..3 {
        println!("delayed tick {}", tick_rx.recv_timeout(Duration::from_secs(2))?);
    }

    ui.shutdown();
    Ok(())
}
