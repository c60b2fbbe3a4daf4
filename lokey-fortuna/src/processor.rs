use std::sync::Arc;
use std::time::Duration;

use lokey_api::{Error, Result};
use lokey_queue::{FortunaQueue, TrngQueue};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::fortuna::FortunaCore;

/// Runs one emission tick: drains up to `batch_size` unconsumed TRNG
/// records, absorbs them into the pools, evaluates the reseed trigger once
/// per batch, then emits `seed_count` Fortuna chunks. Skips emission
/// (without failing the tick) when the generator is not yet seeded.
pub async fn process_tick(
    core: &Arc<Mutex<FortunaCore>>,
    trng_queue: &TrngQueue,
    fortuna_queue: &FortunaQueue,
    batch_size: u32,
    seed_count: u32,
    chunk_size: u32,
    amplification_factor: u32,
) -> Result<()> {
    let batch = trng_queue.fetch(batch_size, 0, true).await?;
    if !batch.is_empty() {
        let mut guard = core.lock();
        for record in &batch {
            guard.accumulate(&record.hash);
        }
        guard.maybe_reseed();
    }

    let len = chunk_size as usize * amplification_factor as usize;
    for _ in 0..seed_count {
        let generated = {
            let mut guard = core.lock();
            guard.generate(len)
        };
        let data = match generated {
            Ok(data) => data,
            Err(Error::NotSeeded) => {
                log::debug!("fortuna generator not yet seeded; skipping emission this tick");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        fortuna_queue.append(data, chunk_size, amplification_factor).await?;
    }
    Ok(())
}

/// Runs `process_tick` on a cooperative, best-effort interval, mirroring
/// the TRNG producer's scheduler: a tick that overruns its interval is
/// never followed by a catch-up burst.
#[allow(clippy::too_many_arguments)]
pub async fn run_scheduler(
    core: Arc<Mutex<FortunaCore>>,
    trng_queue: Arc<TrngQueue>,
    fortuna_queue: Arc<FortunaQueue>,
    interval_ms: u64,
    batch_size: u32,
    seed_count: u32,
    chunk_size: u32,
    amplification_factor: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let result = process_tick(
                    &core,
                    &trng_queue,
                    &fortuna_queue,
                    batch_size,
                    seed_count,
                    chunk_size,
                    amplification_factor,
                )
                .await;
                if let Err(e) = result {
                    log::error!("fortuna tick failed: {e}");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    log::info!("fortuna scheduler shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fortuna::FortunaConfig;
    use lokey_api::Source;
    use std::time::Duration as StdDuration;

    async fn trng_queue(max_len: usize) -> TrngQueue {
        let pool = lokey_queue::open(":memory:", None).await.unwrap();
        TrngQueue::new(pool, max_len)
    }

    async fn fortuna_queue(max_len: usize) -> FortunaQueue {
        let pool = lokey_queue::open(":memory:", None).await.unwrap();
        FortunaQueue::new(pool, max_len)
    }

    #[tokio::test]
    async fn tick_with_no_trng_records_and_unseeded_generator_emits_nothing() {
        let core = Arc::new(Mutex::new(FortunaCore::new(FortunaConfig::default())));
        let trng = trng_queue(100).await;
        let fortuna = fortuna_queue(100).await;

        process_tick(&core, &trng, &fortuna, 16, 1, 32, 4).await.unwrap();

        let stats = fortuna.stats().await.unwrap();
        assert_eq!(stats.total, 0);
    }

    #[tokio::test]
    async fn tick_drains_trng_queue_and_emits_once_seeded() {
        let config = FortunaConfig {
            reseed_threshold: 64,
            min_reseed_interval: StdDuration::from_millis(0),
            ..Default::default()
        };
        let core = Arc::new(Mutex::new(FortunaCore::new(config)));
        let trng = trng_queue(100).await;
        let fortuna = fortuna_queue(100).await;

        for _ in 0..4 {
            trng.append(vec![0x11; 32], Source::Software, 32).await.unwrap();
        }

        process_tick(&core, &trng, &fortuna, 16, 2, 32, 4).await.unwrap();

        let trng_stats = trng.stats().await.unwrap();
        assert_eq!(trng_stats.unconsumed, 0, "batch must be consumed from the trng queue");

        let fortuna_stats = fortuna.stats().await.unwrap();
        assert_eq!(fortuna_stats.total, 2, "seed_count chunks must be emitted once seeded");
        assert_eq!(core.lock().reseed_count(), 1);
    }
}
