use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ap_core::{
    ContentType, Error, FileInfo, HistoryPage, HistoryRecord, HistoryStorage, InputData,
    NewHistoryRecord, Result,
};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS content_history (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        content_type TEXT NOT NULL,
        input_data TEXT NOT NULL,
        output_data TEXT NOT NULL,
        file_info TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_content_history_user_created
    ON content_history (user_id, created_at DESC)
    "#,
    // Add future migrations here
];

fn storage_error(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Storage(format!("{}: {}", context, e))
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| storage_error("Failed to parse date", e))
}

pub struct SqliteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| storage_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| storage_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn record_from_row(row: &SqliteRow) -> Result<HistoryRecord> {
        let content_type: String = row.get("content_type");
        let input_data: String = row.get("input_data");
        let file_info: Option<String> = row.get("file_info");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(HistoryRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            content_type: content_type.parse::<ContentType>()?,
            input_data: serde_json::from_str::<InputData>(&input_data)?,
            output_data: row.get("output_data"),
            file_info: file_info
                .map(|info| serde_json::from_str::<FileInfo>(&info))
                .transpose()?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

#[async_trait]
impl HistoryStorage for SqliteStorage {
    async fn save(&self, user_id: &str, record: NewHistoryRecord) -> Result<HistoryRecord> {
        let record = HistoryRecord::new(user_id, record);
        let input_data = serde_json::to_string(&record.input_data)?;
        let file_info = record
            .file_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO content_history
            (id, user_id, content_type, input_data, output_data, file_info, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(record.content_type.as_str())
        .bind(input_data)
        .bind(&record.output_data)
        .bind(file_info)
        .bind(timestamp(&record.created_at))
        .bind(timestamp(&record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to save history record", e))?;

        Ok(record)
    }

    async fn list(
        &self,
        user_id: &str,
        limit: usize,
        content_type: Option<ContentType>,
    ) -> Result<HistoryPage> {
        let type_filter = content_type.map(|t| t.as_str());

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM content_history
            WHERE user_id = ? AND (? IS NULL OR content_type = ?)
            "#,
        )
        .bind(user_id)
        .bind(type_filter)
        .bind(type_filter)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to count history", e))?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM content_history
            WHERE user_id = ? AND (? IS NULL OR content_type = ?)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(type_filter)
        .bind(type_filter)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to fetch history", e))?;

        let data = rows
            .iter()
            .map(Self::record_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(HistoryPage::new(data, count.max(0) as u64, limit))
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM content_history WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to delete history record", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM content_history WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to clear history", e))?;
        Ok(result.rows_affected())
    }
}
