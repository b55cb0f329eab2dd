use async_trait::async_trait;
use crate::types::{ContentType, HistoryPage, HistoryRecord, NewHistoryRecord};
use crate::Result;

/// Per-user log of analysis results. Every operation is scoped to `user_id`.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Store a new record and return it with its id and timestamps filled in
    async fn save(&self, user_id: &str, record: NewHistoryRecord) -> Result<HistoryRecord>;

    /// Newest-first page of at most `limit` records, optionally filtered by type
    async fn list(
        &self,
        user_id: &str,
        limit: usize,
        content_type: Option<ContentType>,
    ) -> Result<HistoryPage>;

    /// Remove one record. Returns false when no record of this user matched.
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool>;

    /// Remove all records of a user, returning how many were dropped
    async fn clear(&self, user_id: &str) -> Result<u64>;
}
