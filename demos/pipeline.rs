//! # Example: pipeline
//!
//! Search-box style pipeline: keystrokes are debounced, filtered, looked up on the io
//! scheduler and delivered back on the computation scheduler. Failures in a stage flow to
//! the error callback; undeliverable errors reach the global error hook.
//!
//! ## Flow
//! ```text
//! keystrokes ─► debounce(200ms) ─► filter(len >= 3) ─► try_map(lookup)
//!     ─► subscribe_on(io) ─► observe_on(computation) ─► subscriber()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example pipeline
//! ```

use std::sync::Arc;
use std::time::Duration;

use rxvisor::{Disposable, Emitter, Observable, Plugins, RxError, Schedulers};
use tracing_subscriber::EnvFilter;

const TYPED: [(u64, &str); 7] = [
    (0, "r"),
    (40, "ru"),
    (80, "rus"),
    (120, "rust"),
    (600, "ru"),
    (1000, "reactive"),
    (1500, "xx!"),
];

fn lookup(query: String) -> Result<String, RxError> {
    if query.ends_with('!') {
        return Err(RxError::illegal_argument(format!("bad query {query:?}")));
    }
    Ok(format!("{} results for {query:?}", query.len() * 7))
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. Route undeliverable errors somewhere visible.
    Plugins::global().set_error_handler(Some(Arc::new(|e: RxError| {
        tracing::warn!(label = e.as_label(), err = %e, "undeliverable");
    })))?;

    // 2. Simulated keystrokes.
    let keystrokes = Observable::create(|e: Emitter<String>| {
        std::thread::spawn(move || {
            let mut last = 0;
            for (at, text) in TYPED {
                std::thread::sleep(Duration::from_millis(at - last));
                last = at;
                e.on_next(text.to_string());
            }
            std::thread::sleep(Duration::from_millis(300));
            e.on_complete();
        });
        Ok(())
    });

    // 3. Build and subscribe the pipeline.
    let handle = keystrokes
        .debounce(Duration::from_millis(200), Schedulers::computation())
        .filter(|q| q.len() >= 3)
        .do_on_next(|q| {
            tracing::info!(query = %q, "searching");
            Ok(())
        })
        .try_map(lookup)
        .subscribe_on(Schedulers::io())
        .observe_on(Schedulers::computation())
        .subscriber()
        .on_next(|r| println!("result: {r}"))
        .on_error(|e| println!("pipeline failed: {e}"))
        .on_complete(|| println!("pipeline done"))
        .subscribe()?;

    tokio::time::sleep(Duration::from_secs(3)).await;
    handle.dispose();
    Ok(())
}
