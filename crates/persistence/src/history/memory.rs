use super::{HistoryStore, NewPredictionRecord, PredictionRecord};
use crate::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// プロセス内に保持する履歴。再起動で消える
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: RwLock<Vec<PredictionRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, record: NewPredictionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let id = records.len() as i32 + 1;
        records.push(PredictionRecord {
            id,
            ts: record.ts,
            predicted_peak_flow: record.predicted_peak_flow,
            peak_flow_percent: record.peak_flow_percent,
            zone: record.zone,
        });
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<PredictionRecord>> {
        let records = self.records.read().await;
        let take = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(records.iter().rev().take(take).cloned().collect())
    }
}
