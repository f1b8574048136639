use anyhow::Result;
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    FromRow, Row,
};

use crate::domain::HistoryEntry;

/// Entries beyond the newest 50 are evicted on every append.
pub const HISTORY_CAP: i64 = 50;
/// How many entries the default history view shows.
pub const VISIBLE_HISTORY: i64 = 10;

#[derive(Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Inserts the entry at the front of the log and evicts anything past
    /// the cap, atomically.
    pub async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO history (item_name, garbage_type, success, shown_at, icon)
                VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(&entry.item_name)
        .bind(&entry.garbage_type)
        .bind(entry.success)
        .bind(&entry.timestamp)
        .bind(&entry.icon)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"DELETE FROM history
                WHERE id NOT IN (SELECT id FROM history ORDER BY id DESC LIMIT ?1)"#,
        )
        .bind(HISTORY_CAP)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The newest `limit` entries, most recent first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryEntry>(
            r#"SELECT item_name, garbage_type, success, shown_at, icon
                FROM history ORDER BY id DESC LIMIT ?1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM history"#)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn clear(&self) -> Result<u64> {
        let affected = sqlx::query(r#"DELETE FROM history"#)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }
}

impl<'r> FromRow<'r, SqliteRow> for HistoryEntry {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            item_name: row.try_get("item_name")?,
            garbage_type: row.try_get("garbage_type")?,
            success: row.try_get("success")?,
            timestamp: row.try_get("shown_at")?,
            icon: row.try_get("icon")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    use super::*;

    async fn memory_repo() -> HistoryRepository {
        // A single connection keeps every query on the same in-memory db.
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        crate::db::apply_schema(&pool).await.unwrap();
        HistoryRepository::new(pool)
    }

    fn entry(name: &str) -> HistoryEntry {
        HistoryEntry {
            item_name: name.to_string(),
            garbage_type: "可回收垃圾".to_string(),
            success: true,
            timestamp: "2025-11-03 10:00:00".to_string(),
            icon: "♻️".to_string(),
        }
    }

    #[tokio::test]
    async fn append_caps_the_log_at_fifty_newest_first() {
        let repo = memory_repo().await;
        for i in 0..60 {
            repo.append(&entry(&format!("物品{i}"))).await.unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), HISTORY_CAP);

        let all = repo.recent(HISTORY_CAP).await.unwrap();
        assert_eq!(all.len(), HISTORY_CAP as usize);
        assert_eq!(all.first().unwrap().item_name, "物品59");
        assert_eq!(all.last().unwrap().item_name, "物品10");
    }

    #[tokio::test]
    async fn recent_limits_to_the_visible_subset() {
        let repo = memory_repo().await;
        for i in 0..15 {
            repo.append(&entry(&format!("物品{i}"))).await.unwrap();
        }

        let visible = repo.recent(VISIBLE_HISTORY).await.unwrap();
        assert_eq!(visible.len(), VISIBLE_HISTORY as usize);
        assert_eq!(visible[0].item_name, "物品14");
    }

    #[tokio::test]
    async fn clear_empties_the_log() {
        let repo = memory_repo().await;
        repo.append(&entry("电池")).await.unwrap();
        repo.append(&entry("瓶子")).await.unwrap();

        assert_eq!(repo.clear().await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.recent(VISIBLE_HISTORY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_round_trip_their_fields() {
        let repo = memory_repo().await;
        let original = HistoryEntry {
            item_name: "过期药品".to_string(),
            garbage_type: "有害垃圾".to_string(),
            success: false,
            timestamp: "2025-11-03 10:22:41".to_string(),
            icon: "❓".to_string(),
        };
        repo.append(&original).await.unwrap();

        let stored = repo.recent(1).await.unwrap().remove(0);
        assert_eq!(stored.item_name, original.item_name);
        assert_eq!(stored.garbage_type, original.garbage_type);
        assert!(!stored.success);
        assert_eq!(stored.timestamp, original.timestamp);
        assert_eq!(stored.icon, original.icon);
    }
}
