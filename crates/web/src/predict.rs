use super::{ApiError, AppState};
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use common::api::PredictResponse;
use logging::*;
use serde_json::Value;
use std::result::Result;
use std::sync::Arc;

pub fn add_route(app: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    app.route("/predict", post(predict))
}

/// Content-Type に関わらず本文を JSON として読む
pub(crate) async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let log = DEFAULT.new(o!("function" => "web::predict"));

    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        debug!(log, "unparsable body"; "error" => %e);
        ApiError::BadRequest(format!("invalid JSON body: {}", e))
    })?;

    let assessment = state.service.assess(&body).await.map_err(|e| {
        debug!(log, "bad request"; "error" => %e);
        ApiError::from(e)
    })?;
    Ok(Json(assessment.to_response()))
}
