use thiserror::Error;

/// Error kinds shared across the TRNG producer, the Fortuna core, and the
/// bounded queue, per the error handling design.
#[derive(Debug, Error)]
pub enum Error {
    /// Bus init or wake failed; the TRNG producer falls back to software
    /// mode permanently for the life of the process.
    #[error("hardware TRNG unavailable: {0}")]
    HardwareUnavailable(String),

    /// A mid-operation bus error. The current tick is dropped; the producer
    /// stays in whatever mode it was already in.
    #[error("transient hardware error: {0}")]
    HardwareTransient(String),

    /// Storage I/O or schema error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The Fortuna generator was asked to emit before the first reseed.
    #[error("generator not yet seeded")]
    NotSeeded,

    /// A request parameter fell outside its documented bounds.
    #[error("out of bounds: {0}")]
    Overflow(String),

    /// A stored record failed its checksum or was a short read.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// An environment variable could not be parsed, or left no viable mode.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
