use crate::{Error, Result};

/// Process configuration, parsed once at startup from the environment.
/// Every field has a default so an empty environment still produces a
/// runnable service.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub i2c_bus_number: u8,
    pub hash_interval_ms: u64,
    pub trng_queue_size: usize,
    pub fortuna_queue_size: usize,
    pub process_interval_ms: u64,
    pub amplification_factor: u32,
    pub seed_count: u32,
    pub force_mock_mode: bool,
    pub db_memory_limit_kb: Option<u64>,
    pub retention_days: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            db_path: "lokey.db".to_string(),
            i2c_bus_number: 0,
            hash_interval_ms: 1000,
            trng_queue_size: 1000,
            fortuna_queue_size: 1000,
            process_interval_ms: 1000,
            amplification_factor: 4,
            seed_count: 1,
            force_mock_mode: false,
            db_memory_limit_kb: None,
            retention_days: None,
        }
    }
}

impl Config {
    /// Parse configuration from the process environment, falling back to
    /// defaults for anything unset. Returns `Error::Config` for a value
    /// present but unparsable or out of its documented bounds.
    pub fn from_env() -> Result<Config> {
        let defaults = Config::default();
        Ok(Config {
            port: env_parsed("PORT", defaults.port)?,
            db_path: std::env::var("DB_PATH").unwrap_or(defaults.db_path),
            i2c_bus_number: env_parsed("I2C_BUS_NUMBER", defaults.i2c_bus_number)?,
            hash_interval_ms: env_parsed_min("HASH_INTERVAL_MS", defaults.hash_interval_ms, 1)?,
            trng_queue_size: env_parsed_min("TRNG_QUEUE_SIZE", defaults.trng_queue_size, 1)?,
            fortuna_queue_size: env_parsed_min("FORTUNA_QUEUE_SIZE", defaults.fortuna_queue_size, 1)?,
            process_interval_ms: env_parsed_min(
                "PROCESS_INTERVAL_MS",
                defaults.process_interval_ms,
                1,
            )?,
            amplification_factor: env_parsed_min(
                "AMPLIFICATION_FACTOR",
                defaults.amplification_factor,
                1,
            )?,
            seed_count: env_parsed_min("SEED_COUNT", defaults.seed_count, 1)?,
            force_mock_mode: env_bool("FORCE_MOCK_MODE", defaults.force_mock_mode)?,
            db_memory_limit_kb: env_opt("DB_MEMORY_LIMIT")?,
            retention_days: env_opt("RETENTION_DAYS")?,
        })
    }
}

fn env_parsed<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|_| Error::Config(format!("{name} must be an integer, got {v:?}"))),
        Err(_) => Ok(default),
    }
}

fn env_parsed_min<T>(name: &str, default: T, min: T) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display,
{
    let value = env_parsed(name, default)?;
    if value < min {
        return Err(Error::Config(format!("{name} must be >= {min}, got {value}")));
    }
    Ok(value)
}

fn env_bool(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Ok(v) => match v.as_str() {
            "1" | "true" | "TRUE" | "yes" => Ok(true),
            "0" | "false" | "FALSE" | "no" => Ok(false),
            other => Err(Error::Config(format!("{name} must be a boolean, got {other:?}"))),
        },
        Err(_) => Ok(default),
    }
}

fn env_opt<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name} must be an integer, got {v:?}"))),
        Err(_) => Ok(None),
    }
}
