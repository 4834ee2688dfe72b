use crate::Result;
use anyhow::anyhow;
use deadpool_diesel::postgres::Pool;
use deadpool_diesel::{Manager, ManagerConfig, RecyclingMethod};
use logging::*;

pub type Client = deadpool_diesel::postgres::Connection;

const DEFAULT_POOL_SIZE: usize = 16;

/// 設定 (PG_DSN, PG_POOL_SIZE) からプールを作る。接続自体は初回取得時まで行わない
pub fn build() -> Result<Pool> {
    let log = DEFAULT.new(o!("function" => "connection_pool::build"));

    let max_size = common::config::get_or("PG_POOL_SIZE", DEFAULT_POOL_SIZE);
    let dsn = common::config::get("PG_DSN")
        .map_err(|e| anyhow!("PG_DSN is required for the postgres history backend: {}", e))?;
    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let mgr = Manager::from_config(dsn, deadpool_diesel::Runtime::Tokio1, mgr_config);
    let pool = Pool::builder(mgr)
        .max_size(max_size)
        .build()
        .map_err(|e| anyhow!("failed to build connection pool: {}", e))?;

    info!(log, "connection pool ready"; "max_size" => max_size);
    Ok(pool)
}

pub async fn get(pool: &Pool) -> Result<Client> {
    Ok(pool.get().await?)
}
