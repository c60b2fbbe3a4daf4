use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Labeled origin of a TRNG record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Hardware,
    Software,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Hardware => "hardware",
            Source::Software => "software",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hardware" => Ok(Source::Hardware),
            "software" => Ok(Source::Software),
            other => Err(crate::Error::Corrupt(format!("unknown source tag {other:?}"))),
        }
    }
}

/// One 32-byte hash produced by the TRNG producer. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrngRecord {
    pub id: i64,
    pub hash: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub consumed: bool,
    pub source: Source,
    pub chunk_size: u32,
}

impl TrngRecord {
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

/// One amplified pseudo-random chunk emitted by the Fortuna generator.
/// Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FortunaRecord {
    pub id: i64,
    pub data: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub consumed: bool,
    pub chunk_size: u32,
    pub amplification_factor: u32,
}

impl FortunaRecord {
    pub fn data_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

/// Per-source unconsumed/total counts, reported by `stats()` for the TRNG
/// queue only (the Fortuna queue has no provenance dimension).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceCounts {
    pub hardware: u64,
    pub software: u64,
}

/// Aggregate view of one queue's contents, as returned by `stats()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: u64,
    pub unconsumed: u64,
    pub source_counts: Option<SourceCounts>,
    pub queue_full: bool,
    pub size_estimate_bytes: u64,
}

/// Combined `/stats` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub trng: QueueStats,
    pub fortuna: QueueStats,
    pub reseed_count: u64,
}
