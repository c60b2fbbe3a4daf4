use std::time::{Duration, Instant};

use lokey_api::Result;
use sha2::{Digest, Sha256};

use crate::generator::Generator;
use crate::pool::PoolState;

/// Tunable parameters of the accumulator/reseeder. Unlike
/// [`lokey_api::Config`]'s fields, these are not environment variables;
/// they are internal constants, not exposed on the HTTP surface.
#[derive(Debug, Clone, Copy)]
pub struct FortunaConfig {
    pub pool_count: usize,
    pub reseed_threshold: u64,
    pub min_reseed_interval: Duration,
    /// Max unconsumed TRNG records drained per emission tick.
    pub batch_size: u32,
}

impl Default for FortunaConfig {
    fn default() -> Self {
        FortunaConfig {
            pool_count: 3,
            reseed_threshold: 64,
            min_reseed_interval: Duration::from_millis(100),
            batch_size: 16,
        }
    }
}

/// The pool accumulator, reseeder, and generator, meant to sit behind one
/// lock owned by the caller: accumulate, reseed, and generate share the
/// same short critical section.
pub struct FortunaCore {
    config: FortunaConfig,
    pools: PoolState,
    generator: Generator,
    reseed_count: u64,
    last_reseed: Option<Instant>,
}

impl FortunaCore {
    pub fn new(config: FortunaConfig) -> Self {
        FortunaCore {
            pools: PoolState::new(config.pool_count),
            generator: Generator::new(),
            reseed_count: 0,
            last_reseed: None,
            config,
        }
    }

    pub fn config(&self) -> &FortunaConfig {
        &self.config
    }

    pub fn reseed_count(&self) -> u64 {
        self.reseed_count
    }

    pub fn is_seeded(&self) -> bool {
        self.generator.is_seeded()
    }

    /// Absorbs one incoming TRNG hash into the pools.
    pub fn accumulate(&mut self, hash: &[u8]) {
        self.pools.accumulate(hash);
    }

    /// Evaluates the reseed trigger and performs a reseed if due. Returns
    /// whether a reseed happened.
    pub fn maybe_reseed(&mut self) -> bool {
        let due_by_size = self.pools.pool0_size() >= self.config.reseed_threshold;
        let due_by_time =
            self.last_reseed.map(|t| t.elapsed() >= self.config.min_reseed_interval).unwrap_or(true);
        if !(due_by_size && due_by_time) {
            return false;
        }

        self.reseed_count += 1;
        let drained = self.pools.drain_for_reseed(self.reseed_count);

        let mut s = Sha256::new();
        s.update(self.generator.key());
        for digest in &drained {
            let mut pool_hash = Sha256::new();
            pool_hash.update(digest);
            s.update(pool_hash.finalize());
        }
        let new_key: [u8; 32] = s.finalize().into();

        self.generator.reseed(new_key);
        self.last_reseed = Some(Instant::now());
        true
    }

    /// Generates `len` pseudo-random bytes, or fails with `NotSeeded` if no
    /// reseed has happened yet.
    pub fn generate(&mut self, len: usize) -> Result<Vec<u8>> {
        self.generator.generate(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// With N=3 and reseed_threshold=64, feeding 4 hashes (96 bytes across
    /// pools 0,1,2, then pool 0 again) pushes pool0_size to 64 and triggers
    /// the very next evaluation.
    #[test]
    fn first_reseed_triggers_at_threshold_and_clears_pool0_size() {
        let config = FortunaConfig { min_reseed_interval: Duration::from_millis(0), ..Default::default() };
        let mut core = FortunaCore::new(config);
        assert!(!core.is_seeded());

        for _ in 0..4 {
            core.accumulate(&[0xAB; 32]);
        }
        assert!(core.maybe_reseed());
        assert_eq!(core.reseed_count(), 1);
        assert!(core.is_seeded());

        let out = core.generate(128).unwrap();
        assert_eq!(out.len(), 128);
    }

    #[test]
    fn reseed_does_not_trigger_below_threshold() {
        let config = FortunaConfig { min_reseed_interval: Duration::from_millis(0), ..Default::default() };
        let mut core = FortunaCore::new(config);
        core.accumulate(&[1u8; 16]);
        assert!(!core.maybe_reseed());
        assert_eq!(core.reseed_count(), 0);
    }

    #[test]
    fn generate_before_any_reseed_fails_not_seeded() {
        let mut core = FortunaCore::new(FortunaConfig::default());
        assert!(core.generate(32).is_err());
        assert_eq!(core.reseed_count(), 0);
    }

    #[test]
    fn reseed_respects_min_interval() {
        let config = FortunaConfig {
            reseed_threshold: 1,
            min_reseed_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let mut core = FortunaCore::new(config);
        core.accumulate(&[1u8; 32]);
        assert!(core.maybe_reseed());
        core.accumulate(&[2u8; 32]);
        assert!(!core.maybe_reseed(), "second reseed must wait out min_reseed_interval");
        assert_eq!(core.reseed_count(), 1);
    }
}
