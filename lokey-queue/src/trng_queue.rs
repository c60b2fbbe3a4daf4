use chrono::{DateTime, Utc};
use lokey_api::{QueueStats, Result, Source, SourceCounts, TrngRecord};
use tokio::sync::Mutex;
use sqlx::{Row, SqlitePool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::evict::{evict_expired, evict_over_capacity};

/// Bounded persistent FIFO of TRNG hashes with consume-once semantics.
///
/// Append and consuming-fetch serialize on `consume_lock`; non-consuming
/// reads may run concurrently against the pool. A single writer, a single
/// consume-path lock, and concurrent read-only fetches may proceed in
/// parallel.
pub struct TrngQueue {
    pool: SqlitePool,
    max_len: AtomicUsize,
    retention_days: Option<u32>,
    consume_lock: Arc<Mutex<()>>,
}

struct Row32 {
    id: i64,
    hash: Vec<u8>,
    timestamp: DateTime<Utc>,
    consumed: bool,
    source: String,
    chunk_size: i64,
}

impl TrngQueue {
    pub fn new(pool: SqlitePool, max_len: usize) -> Self {
        Self::with_retention(pool, max_len, None)
    }

    /// Like [`Self::new`], with a `RETENTION_DAYS` TTL applied on every
    /// eviction pass.
    pub fn with_retention(pool: SqlitePool, max_len: usize, retention_days: Option<u32>) -> Self {
        TrngQueue {
            pool,
            max_len: AtomicUsize::new(max_len),
            retention_days,
            consume_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Insert one record; evicts the oldest rows (by timestamp, ties broken
    /// by id) until the queue length is back at `max_queue_size`. Insert and
    /// eviction run in a single transaction.
    pub async fn append(&self, hash: Vec<u8>, source: Source, chunk_size: u32) -> Result<TrngRecord> {
        let _guard = self.consume_lock.lock().await;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO trng_data (hash, hash_hex, timestamp, consumed, source, chunk_size)
             VALUES (?, ?, ?, 0, ?, ?)",
        )
        .bind(&hash)
        .bind(hex::encode(&hash))
        .bind(now.to_rfc3339())
        .bind(source.as_str())
        .bind(chunk_size as i64)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        evict_over_capacity(&mut tx, "trng_data", self.max_len.load(Ordering::Relaxed)).await?;
        evict_expired(&mut tx, "trng_data", self.retention_days).await?;
        tx.commit().await?;

        Ok(TrngRecord { id, hash, timestamp: now, consumed: false, source, chunk_size })
    }

    /// Return up to `limit` oldest unconsumed records, skipping `offset`.
    /// If `consume` is true, atomically marks exactly the returned records
    /// `consumed = true` first; a concurrent consuming fetch can never
    /// observe the same record.
    pub async fn fetch(&self, limit: u32, offset: u32, consume: bool) -> Result<Vec<TrngRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        if !consume {
            let rows = sqlx::query(
                "SELECT id, hash, timestamp, consumed, source, chunk_size FROM trng_data
                 WHERE consumed = 0 ORDER BY timestamp ASC, id ASC LIMIT ? OFFSET ?",
            )
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;
            return Ok(rows_to_records(rows));
        }

        let _guard = self.consume_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let candidates = sqlx::query(
            "SELECT id, hash, timestamp, consumed, source, chunk_size FROM trng_data
             WHERE consumed = 0 ORDER BY timestamp ASC, id ASC LIMIT ? OFFSET ?",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&mut *tx)
        .await?;

        let good = rows_to_records(candidates);
        for rec in &good {
            sqlx::query("UPDATE trng_data SET consumed = 1 WHERE id = ?")
                .bind(rec.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(good.into_iter().map(|mut r| {
            r.consumed = true;
            r
        }).collect())
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS c FROM trng_data")
            .fetch_one(&self.pool)
            .await?
            .get("c");
        let unconsumed: i64 = sqlx::query("SELECT COUNT(*) AS c FROM trng_data WHERE consumed = 0")
            .fetch_one(&self.pool)
            .await?
            .get("c");
        let hardware: i64 =
            sqlx::query("SELECT COUNT(*) AS c FROM trng_data WHERE source = 'hardware'")
                .fetch_one(&self.pool)
                .await?
                .get("c");
        let software: i64 =
            sqlx::query("SELECT COUNT(*) AS c FROM trng_data WHERE source = 'software'")
                .fetch_one(&self.pool)
                .await?
                .get("c");

        let max_len = self.max_len.load(Ordering::Relaxed) as i64;
        Ok(QueueStats {
            total: total as u64,
            unconsumed: unconsumed as u64,
            source_counts: Some(SourceCounts { hardware: hardware as u64, software: software as u64 }),
            queue_full: total >= max_len,
            size_estimate_bytes: (total as u64) * 32,
        })
    }

    /// Update capacity; if the new capacity is below the current length,
    /// evicts the oldest rows until length <= new_max. A no-op when the
    /// current length already fits.
    pub async fn resize(&self, new_max: usize) -> Result<()> {
        let _guard = self.consume_lock.lock().await;
        self.max_len.store(new_max, Ordering::Relaxed);
        let mut tx = self.pool.begin().await?;
        evict_over_capacity(&mut tx, "trng_data", new_max).await?;
        evict_expired(&mut tx, "trng_data", self.retention_days).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn rows_to_records(rows: Vec<sqlx::sqlite::SqliteRow>) -> Vec<TrngRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let r = Row32 {
                id: row.get("id"),
                hash: row.get("hash"),
                timestamp: {
                    let s: String = row.get("timestamp");
                    DateTime::parse_from_rfc3339(&s).ok()?.with_timezone(&Utc)
                },
                consumed: row.get::<i64, _>("consumed") != 0,
                source: row.get("source"),
                chunk_size: row.get("chunk_size"),
            };
            if r.hash.len() != r.chunk_size as usize {
                log::warn!("skipping corrupt trng record {}: short hash", r.id);
                return None;
            }
            let source: Source = r.source.parse().ok()?;
            Some(TrngRecord {
                id: r.id,
                hash: r.hash,
                timestamp: r.timestamp,
                consumed: r.consumed,
                source,
                chunk_size: r.chunk_size as u32,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// `RETENTION_DAYS` only sweeps consumed rows past the window; it never
    /// touches unconsumed ones, and it is not a substitute for capacity
    /// eviction.
    #[tokio::test]
    async fn retention_sweep_drops_old_consumed_rows_only() {
        let pool = crate::open(":memory:", None).await.unwrap();
        let q = TrngQueue::with_retention(pool.clone(), 100, Some(1));

        let old = q.append(vec![1u8; 32], Source::Software, 32).await.unwrap();
        let fresh = q.append(vec![2u8; 32], Source::Software, 32).await.unwrap();

        let stale_timestamp = (Utc::now() - Duration::days(2)).to_rfc3339();
        sqlx::query("UPDATE trng_data SET consumed = 1, timestamp = ? WHERE id = ?")
            .bind(&stale_timestamp)
            .bind(old.id)
            .execute(&pool)
            .await
            .unwrap();

        // A fresh append triggers the sweep pass.
        q.append(vec![3u8; 32], Source::Software, 32).await.unwrap();

        let remaining = q.fetch(10, 0, false).await.unwrap();
        let ids: Vec<i64> = remaining.iter().map(|r| r.id).collect();
        assert!(!ids.contains(&old.id), "stale consumed record must be swept");
        assert!(ids.contains(&fresh.id), "unconsumed record must survive the sweep");
    }
}
