use sha2::{Digest, Sha256};

/// One Fortuna entropy pool: an incremental SHA-256 hash state that
/// absorbs TRNG hashes until drained by a reseed.
struct Pool {
    hasher: Sha256,
}

impl Pool {
    fn new() -> Self {
        Pool { hasher: Sha256::new() }
    }

    fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalizes the pool's digest and resets it to a fresh empty state.
    fn drain(&mut self) -> [u8; 32] {
        std::mem::replace(&mut self.hasher, Sha256::new()).finalize().into()
    }
}

/// The N-pool accumulator: `pools`, a rotating `next_pool` index, and
/// `pool0_size`, the running count of bytes fed into pool 0 since the last
/// reseed. The generator fields live separately in [`crate::Generator`].
pub struct PoolState {
    pools: Vec<Pool>,
    next_pool: usize,
    pool0_size: u64,
}

impl PoolState {
    pub fn new(pool_count: usize) -> Self {
        assert!(pool_count >= 2, "pool_count must be >= 2");
        PoolState { pools: (0..pool_count).map(|_| Pool::new()).collect(), next_pool: 0, pool0_size: 0 }
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pool0_size(&self) -> u64 {
        self.pool0_size
    }

    pub fn next_pool(&self) -> usize {
        self.next_pool
    }

    /// Absorbs one incoming hash into the current pool, then rotates
    /// `next_pool`.
    pub fn accumulate(&mut self, hash: &[u8]) {
        let idx = self.next_pool;
        self.pools[idx].update(hash);
        if idx == 0 {
            self.pool0_size += hash.len() as u64;
        }
        self.next_pool = (idx + 1) % self.pools.len();
    }

    /// Drains the pools due at `reseed_count` (1-based, already incremented
    /// by the caller) under the canonical doubling schedule: pool `i`
    /// participates iff `reseed_count mod 2^i == 0`. Returns the finalized
    /// digest of each drained pool, in pool order, and zeroes `pool0_size`.
    pub fn drain_for_reseed(&mut self, reseed_count: u64) -> Vec<[u8; 32]> {
        let drained = self
            .pools
            .iter_mut()
            .enumerate()
            .filter(|(i, _)| reseed_count.is_multiple_of(1u64 << i))
            .map(|(_, pool)| pool.drain())
            .collect();
        self.pool0_size = 0;
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_rotates_pools_and_tracks_pool0_size() {
        let mut state = PoolState::new(3);
        state.accumulate(&[1u8; 32]);
        state.accumulate(&[2u8; 32]);
        state.accumulate(&[3u8; 32]);
        assert_eq!(state.next_pool(), 0);
        assert_eq!(state.pool0_size(), 32);

        state.accumulate(&[4u8; 32]);
        assert_eq!(state.next_pool(), 1);
        assert_eq!(state.pool0_size(), 64);
    }

    fn reseed_schedule(pool_count: usize, reseed_count: u64) -> Vec<usize> {
        (0..pool_count).filter(|i| reseed_count.is_multiple_of(1u64 << i)).collect()
    }

    /// After 8 reseeds with N=3, pool 0 drains every time, pool 1 on
    /// reseeds {2,4,6,8}, pool 2 on reseeds {4,8}.
    #[test]
    fn canonical_reseed_schedule_doubles_the_drain_period_per_pool() {
        let mut pool1_drains = 0;
        let mut pool2_drains = 0;
        for r in 1..=8u64 {
            let drained = reseed_schedule(3, r);
            assert!(drained.contains(&0));
            if drained.contains(&1) {
                pool1_drains += 1;
            }
            if drained.contains(&2) {
                pool2_drains += 1;
            }
        }
        assert_eq!(pool1_drains, 4);
        assert_eq!(pool2_drains, 2);
    }
}
