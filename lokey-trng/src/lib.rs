//! Hardware TRNG producer: the two-wire bus driver, the OS-entropy
//! fallback, and the periodic harvester loop.

mod bus;
mod producer;

pub use bus::{protocol, MockBus, SecureElementBus};
pub use producer::{ProducerState, TrngProducer};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Runs `producer.tick()` on a cooperative, best-effort interval: if a tick
/// overruns, the next one fires immediately after completion rather than
/// bursting to catch up. Stops when `shutdown` is signalled, finishing any
/// in-flight tick first.
pub async fn run_scheduler(
    producer: Arc<Mutex<TrngProducer>>,
    interval_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let mut p = producer.lock().await;
                if let Err(e) = p.tick().await {
                    log::error!("trng tick failed: {e}");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    log::info!("trng scheduler shutting down");
                    break;
                }
            }
        }
    }
}
