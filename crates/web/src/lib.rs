#![deny(warnings)]

mod basic;
mod error;
mod history;
mod predict;
pub mod service;

#[cfg(test)]
mod fixtures;

pub use error::ApiError;
pub use service::{Assessment, PeakFlowService, Persisted};

use axum::Router;
use logging::*;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

type Result<T> = anyhow::Result<T>;

pub struct AppState {
    pub service: PeakFlowService,
}

impl AppState {
    pub fn new(service: PeakFlowService) -> Self {
        Self { service }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    add_routes(
        Router::new(),
        &[basic::add_route, predict::add_route, history::add_route],
    )
    .with_state(state)
    .layer(cors)
}

pub async fn run(addr: &str, state: Arc<AppState>) -> Result<()> {
    let log = DEFAULT.new(o!("function" => "web::run"));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(log, "http server listening"; "addr" => addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn add_routes<T>(app: Router<T>, funcs: &[fn(Router<T>) -> Router<T>]) -> Router<T> {
    let mut app = app;
    for func in funcs {
        app = func(app);
    }
    app
}
