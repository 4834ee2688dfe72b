
mod memory;
mod pg;

pub use memory::MemoryHistory;
pub use pg::{PgHistory, SCHEMA_SQL};

use crate::Result;
use crate::connection_pool;
use crate::schema::predictions;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use logging::*;
use std::sync::Arc;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 500;

/// 取得件数を [1, MAX_LIMIT] に収める。未指定なら DEFAULT_LIMIT
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = predictions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PredictionRecord {
    pub id: i32,
    pub ts: NaiveDateTime,
    pub predicted_peak_flow: f64,
    pub peak_flow_percent: f64,
    pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = predictions)]
pub struct NewPredictionRecord {
    pub ts: NaiveDateTime,
    pub predicted_peak_flow: f64,
    pub peak_flow_percent: f64,
    pub zone: String,
}

impl NewPredictionRecord {
    /// 現在時刻 (UTC) で記録を作る
    pub fn now(predicted_peak_flow: f64, peak_flow_percent: f64, zone: &str) -> Self {
        Self {
            ts: chrono::Utc::now().naive_utc(),
            predicted_peak_flow,
            peak_flow_percent,
            zone: zone.to_string(),
        }
    }
}

/// 予測履歴の保存先。追記のみで、更新・削除は行わない
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: NewPredictionRecord) -> Result<()>;

    /// 新しい順に最大 `limit` 件
    async fn recent(&self, limit: i64) -> Result<Vec<PredictionRecord>>;
}

/// HISTORY_BACKEND に応じた保存先を作る。postgres ではテーブルの作成まで行う
pub async fn from_config() -> Result<Arc<dyn HistoryStore>> {
    let log = DEFAULT.new(o!("function" => "history::from_config"));

    let backend = common::config::get("HISTORY_BACKEND").unwrap_or_else(|_| "postgres".to_string());
    info!(log, "selecting history backend"; "backend" => &backend);
    match backend.as_str() {
        "postgres" => {
            let pool = connection_pool::build()?;
            Ok(Arc::new(PgHistory::connect(pool).await?))
        }
        "memory" => Ok(Arc::new(MemoryHistory::new())),
        other => Err(anyhow!("unknown HISTORY_BACKEND: {}", other)),
    }
}
