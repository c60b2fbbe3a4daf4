use chrono::{DateTime, Utc};
use lokey_api::{FortunaRecord, QueueStats, Result};
use tokio::sync::Mutex;
use sqlx::{Row, SqlitePool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::evict::{evict_expired, evict_over_capacity};

/// Bounded persistent FIFO of amplified Fortuna chunks with consume-once
/// semantics. Same contract as [`crate::TrngQueue`], minus provenance.
pub struct FortunaQueue {
    pool: SqlitePool,
    max_len: AtomicUsize,
    retention_days: Option<u32>,
    consume_lock: Arc<Mutex<()>>,
}

impl FortunaQueue {
    pub fn new(pool: SqlitePool, max_len: usize) -> Self {
        Self::with_retention(pool, max_len, None)
    }

    /// Like [`Self::new`], with a `RETENTION_DAYS` TTL applied on every
    /// eviction pass.
    pub fn with_retention(pool: SqlitePool, max_len: usize, retention_days: Option<u32>) -> Self {
        FortunaQueue {
            pool,
            max_len: AtomicUsize::new(max_len),
            retention_days,
            consume_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn append(
        &self,
        data: Vec<u8>,
        chunk_size: u32,
        amplification_factor: u32,
    ) -> Result<FortunaRecord> {
        let _guard = self.consume_lock.lock().await;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO fortuna_data (data, timestamp, consumed, chunk_size, amplification_factor)
             VALUES (?, ?, 0, ?, ?)",
        )
        .bind(&data)
        .bind(now.to_rfc3339())
        .bind(chunk_size as i64)
        .bind(amplification_factor as i64)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        evict_over_capacity(&mut tx, "fortuna_data", self.max_len.load(Ordering::Relaxed)).await?;
        evict_expired(&mut tx, "fortuna_data", self.retention_days).await?;
        tx.commit().await?;

        Ok(FortunaRecord { id, data, timestamp: now, consumed: false, chunk_size, amplification_factor })
    }

    pub async fn fetch(&self, limit: u32, offset: u32, consume: bool) -> Result<Vec<FortunaRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        if !consume {
            let rows = sqlx::query(
                "SELECT id, data, timestamp, consumed, chunk_size, amplification_factor
                 FROM fortuna_data WHERE consumed = 0 ORDER BY timestamp ASC, id ASC LIMIT ? OFFSET ?",
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
            "SELECT id, data, timestamp, consumed, chunk_size, amplification_factor
             FROM fortuna_data WHERE consumed = 0 ORDER BY timestamp ASC, id ASC LIMIT ? OFFSET ?",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&mut *tx)
        .await?;

        let good = rows_to_records(candidates);
        for rec in &good {
            sqlx::query("UPDATE fortuna_data SET consumed = 1 WHERE id = ?")
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
        let total: i64 = sqlx::query("SELECT COUNT(*) AS c FROM fortuna_data")
            .fetch_one(&self.pool)
            .await?
            .get("c");
        let unconsumed: i64 = sqlx::query("SELECT COUNT(*) AS c FROM fortuna_data WHERE consumed = 0")
            .fetch_one(&self.pool)
            .await?
            .get("c");

        let max_len = self.max_len.load(Ordering::Relaxed) as i64;
        let avg_size: Option<(i64, i64)> =
            sqlx::query_as("SELECT chunk_size, amplification_factor FROM fortuna_data LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        let per_record = avg_size.map(|(c, a)| (c * a) as u64).unwrap_or(0);

        Ok(QueueStats {
            total: total as u64,
            unconsumed: unconsumed as u64,
            source_counts: None,
            queue_full: total >= max_len,
            size_estimate_bytes: (total as u64) * per_record,
        })
    }

    pub async fn resize(&self, new_max: usize) -> Result<()> {
        let _guard = self.consume_lock.lock().await;
        self.max_len.store(new_max, Ordering::Relaxed);
        let mut tx = self.pool.begin().await?;
        evict_over_capacity(&mut tx, "fortuna_data", new_max).await?;
        evict_expired(&mut tx, "fortuna_data", self.retention_days).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn rows_to_records(rows: Vec<sqlx::sqlite::SqliteRow>) -> Vec<FortunaRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let chunk_size: i64 = row.get("chunk_size");
            let amplification_factor: i64 = row.get("amplification_factor");
            let data: Vec<u8> = row.get("data");
            let expected_len = chunk_size as usize * amplification_factor as usize;
            let id: i64 = row.get("id");
            if data.len() != expected_len {
                log::warn!("skipping corrupt fortuna record {id}: length mismatch");
                return None;
            }
            let timestamp_str: String = row.get("timestamp");
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str).ok()?.with_timezone(&Utc);
            Some(FortunaRecord {
                id,
                data,
                timestamp,
                consumed: row.get::<i64, _>("consumed") != 0,
                chunk_size: chunk_size as u32,
                amplification_factor: amplification_factor as u32,
            })
        })
        .collect()
}
