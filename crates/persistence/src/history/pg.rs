use super::{HistoryStore, NewPredictionRecord, PredictionRecord};
use crate::Result;
use crate::connection_pool;
use crate::schema::predictions;
use anyhow::anyhow;
use async_trait::async_trait;
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use logging::*;

/// `predictions` テーブルの定義。何度実行してもよい
pub const SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-01-15-000000_create_predictions/up.sql");

pub struct PgHistory {
    pool: Pool,
}

impl PgHistory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// プールを受け取り、テーブルが無ければ作ってから返す
    pub async fn connect(pool: Pool) -> Result<Self> {
        let history = Self::new(pool);
        history.ensure_schema().await?;
        Ok(history)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        let log = DEFAULT.new(o!("function" => "PgHistory::ensure_schema"));
        let conn = connection_pool::get(&self.pool).await?;

        conn.interact(|conn| diesel::sql_query(SCHEMA_SQL).execute(conn))
            .await
            .map_err(|e| anyhow!("Database interaction error: {:?}", e))??;

        info!(log, "predictions table ready");
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PgHistory {
    async fn append(&self, record: NewPredictionRecord) -> Result<()> {
        let conn = connection_pool::get(&self.pool).await?;

        conn.interact(move |conn| {
            diesel::insert_into(predictions::table)
                .values(&record)
                .execute(conn)
        })
        .await
        .map_err(|e| anyhow!("Database interaction error: {:?}", e))??;

        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<PredictionRecord>> {
        let conn = connection_pool::get(&self.pool).await?;

        let results = conn
            .interact(move |conn| {
                predictions::table
                    .order_by(predictions::id.desc())
                    .limit(limit)
                    .select(PredictionRecord::as_select())
                    .load::<PredictionRecord>(conn)
            })
            .await
            .map_err(|e| anyhow!("Database interaction error: {:?}", e))??;

        Ok(results)
    }
}
