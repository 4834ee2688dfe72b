use super::{ApiError, AppState};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use common::api::HistoryEntry;
use logging::*;
use serde::Deserialize;
use std::result::Result;
use std::sync::Arc;

pub fn add_route(app: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    app.route("/history", get(history))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HistoryQuery {
    pub(crate) limit: Option<String>,
}

impl HistoryQuery {
    /// 数値として読めない値は未指定扱い
    fn limit(&self) -> Option<i64> {
        self.limit.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

pub(crate) async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let log = DEFAULT.new(o!("function" => "web::history"));

    let entries = state.service.recent(query.limit()).await.map_err(|e| {
        error!(log, "failed to read history"; "error" => %e);
        ApiError::from(e)
    })?;
    Ok(Json(entries))
}
