//! Bounded persistent FIFO storage with consume-once semantics.
//!
//! Each producer (the TRNG source, the Fortuna generator) gets its own
//! table and its own [`TrngQueue`]/[`FortunaQueue`] handle, both backed by
//! the same SQLite database opened with [`storage::open`].

mod evict;
mod fortuna_queue;
mod storage;
mod trng_queue;

pub use fortuna_queue::FortunaQueue;
pub use storage::open;
pub use trng_queue::TrngQueue;
