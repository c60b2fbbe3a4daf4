//! Shared types for the Lokey RNG service: records, configuration, and the
//! error kinds used by the TRNG producer, Fortuna core, and queue storage.

mod config;
mod error;
mod record;

pub use config::Config;
pub use error::{Error, Result};
pub use record::{FortunaRecord, QueueStats, ServiceStats, Source, SourceCounts, TrngRecord};
