use async_trait::async_trait;
use ap_core::{ContentType, HistoryPage, HistoryRecord, HistoryStorage, NewHistoryRecord, Result};
use tokio::sync::RwLock;

/// History kept in process memory, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStorage {
    // Oldest first
    records: RwLock<Vec<HistoryRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStorage for MemoryStorage {
    async fn save(&self, user_id: &str, record: NewHistoryRecord) -> Result<HistoryRecord> {
        let record = HistoryRecord::new(user_id, record);
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(
        &self,
        user_id: &str,
        limit: usize,
        content_type: Option<ContentType>,
    ) -> Result<HistoryPage> {
        let records = self.records.read().await;
        let matching: Vec<&HistoryRecord> = records
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .filter(|r| content_type.map_or(true, |t| r.content_type == t))
            .collect();

        let count = matching.len() as u64;
        let data = matching.into_iter().take(limit).cloned().collect();
        Ok(HistoryPage::new(data, count, limit))
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(records.len() < before)
    }

    async fn clear(&self, user_id: &str) -> Result<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.user_id != user_id);
        Ok((before - records.len()) as u64)
    }
}
