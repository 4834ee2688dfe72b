use super::AppState;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;

pub const BANNER: &str = "Asthma Peak Flow API running";

pub fn add_route(app: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    app.route("/", get(|| async { BANNER }))
        .route("/healthcheck", get(|| async { "OK" }))
}
