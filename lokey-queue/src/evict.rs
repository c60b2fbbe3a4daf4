use chrono::Utc;
use lokey_api::Result;
use sqlx::Row;

/// Deletes the oldest rows (by timestamp, ties broken by id) from `table`
/// until its row count is <= `max_len`. Must run inside the caller's
/// transaction so insert-then-evict (or resize-then-evict) is atomic.
pub(crate) async fn evict_over_capacity(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    table: &str,
    max_len: usize,
) -> Result<()> {
    let count: i64 = sqlx::query(&format!("SELECT COUNT(*) AS c FROM {table}"))
        .fetch_one(&mut **tx)
        .await?
        .get("c");
    let overflow = count - max_len as i64;
    if overflow > 0 {
        let sql = format!(
            "DELETE FROM {table} WHERE id IN (
                SELECT id FROM {table} ORDER BY timestamp ASC, id ASC LIMIT ?
            )"
        );
        sqlx::query(&sql).bind(overflow).execute(&mut **tx).await?;
    }
    Ok(())
}

/// `RETENTION_DAYS` sweep: deletes consumed rows older than the retention
/// window. Additive cleanup only, it never touches unconsumed records and
/// is never a substitute for [`evict_over_capacity`]'s `max_queue_size` rule.
pub(crate) async fn evict_expired(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    table: &str,
    retention_days: Option<u32>,
) -> Result<()> {
    let Some(days) = retention_days else { return Ok(()) };
    let cutoff = Utc::now() - chrono::Duration::days(days as i64);
    let sql = format!("DELETE FROM {table} WHERE consumed = 1 AND timestamp < ?");
    sqlx::query(&sql).bind(cutoff.to_rfc3339()).execute(&mut **tx).await?;
    Ok(())
}
