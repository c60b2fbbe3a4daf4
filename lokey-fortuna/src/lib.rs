//! Fortuna pool accumulator, reseeder, and AES-256-CTR generator.

mod fortuna;
mod generator;
mod pool;
mod processor;

pub use fortuna::{FortunaConfig, FortunaCore};
pub use generator::Generator;
pub use pool::PoolState;
pub use processor::{process_tick, run_scheduler};
