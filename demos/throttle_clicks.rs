//! # Example: throttle_clicks
//!
//! A burst of simulated button clicks, throttled to one per second and printed through the
//! built-in [`LogObserver`].
//!
//! ## Flow
//! ```text
//! clicks @ 0, 10, 300, 1100, 1150, 2500 ms
//!     └─► throttle_first(1s) ─► 0, 1100, 2500
//!           └─► LogObserver ─► tracing
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example throttle_clicks --features logging
//! ```

use std::time::Duration;

use rxvisor::{Emitter, LogObserver, Observable, Schedulers};
use tracing_subscriber::EnvFilter;

const CLICKS_MS: [u64; 6] = [0, 10, 300, 1100, 1150, 2500];

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. A source of "clicks" emitting the time offset of each click.
    let clicks = Observable::create(|e: Emitter<u64>| {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now();
            for at in CLICKS_MS {
                tokio::time::sleep_until(start + Duration::from_millis(at)).await;
                e.on_next(at);
            }
            e.on_complete();
        });
        Ok(())
    });

    // 2. Keep only the first click of every second.
    clicks
        .throttle_first(Duration::from_secs(1), Schedulers::current()?)
        .subscribe_with(LogObserver::new("clicks"))?;

    // 3. Let the burst play out.
    tokio::time::sleep(Duration::from_millis(3000)).await;
    Ok(())
}
