use lokey_api::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Open (creating if absent) the SQLite database at `db_path`, run the
/// embedded migrations, and apply `DB_MEMORY_LIMIT` as the page cache size.
///
/// `db_path` may be `":memory:"` for tests, in which case a single pooled
/// connection is kept alive so the in-memory database survives across
/// queries (a fresh `:memory:` file is otherwise created per connection).
pub async fn open(db_path: &str, memory_limit_kb: Option<u64>) -> Result<SqlitePool> {
    let is_memory = db_path == ":memory:";
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{db_path}"))
        .map_err(|e| Error::Storage(e.to_string()))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(if is_memory { 1 } else { 8 })
        .connect_with(options)
        .await?;

    if let Some(kb) = memory_limit_kb {
        // Negative cache_size is interpreted by SQLite as kibibytes.
        let pragma = format!("PRAGMA cache_size = -{kb};");
        sqlx::query(&pragma).execute(&pool).await?;
    }

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    log::info!("running storage migrations");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await?;

    for (name, sql) in migrations() {
        let applied: Option<(String,)> = sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        if applied.is_none() {
            log::info!("applying migration: {name}");
            for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                sqlx::query(statement).execute(pool).await?;
            }
            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await?;
        }
    }

    log::info!("storage migrations complete");
    Ok(())
}

fn migrations() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "001_create_trng_data",
            "CREATE TABLE IF NOT EXISTS trng_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hash BLOB NOT NULL,
                hash_hex TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                consumed INTEGER NOT NULL DEFAULT 0,
                source TEXT NOT NULL,
                chunk_size INTEGER NOT NULL
            )",
        ),
        (
            "002_create_fortuna_data",
            "CREATE TABLE IF NOT EXISTS fortuna_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                data BLOB NOT NULL,
                timestamp TEXT NOT NULL,
                consumed INTEGER NOT NULL DEFAULT 0,
                chunk_size INTEGER NOT NULL,
                amplification_factor INTEGER NOT NULL
            )",
        ),
        (
            "003_create_metadata",
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        ),
        (
            "004_create_indexes",
            "CREATE INDEX IF NOT EXISTS idx_trng_timestamp ON trng_data(timestamp);
             CREATE INDEX IF NOT EXISTS idx_fortuna_timestamp ON fortuna_data(timestamp);",
        ),
    ]
}
