#![deny(warnings)]

use anyhow::Result;
use common::config;
use logging::*;
use peakflow::bundle::ModelBundle;
use peakflow::inference::InferenceEngine;
use std::sync::Arc;
use web::{AppState, PeakFlowService};

#[tokio::main]
async fn main() {
    let log = DEFAULT.new(o!("function" => "main"));
    info!(log, "Starting up");

    tokio::select! {
        res = serve() => {
            if let Err(e) = res {
                error!(log, "server stopped"; "error" => %e);
                logging::shutdown();
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!(log, "shutting down");
        }
    }
    logging::shutdown();
}

async fn serve() -> Result<()> {
    let log = DEFAULT.new(o!("function" => "serve"));

    let bundle_path = config::get("MODEL_BUNDLE_PATH")?;
    let bundle = ModelBundle::load(&bundle_path)?;
    info!(log, "bundle ready";
        "path" => &bundle_path,
        "bundle_id" => bundle.id().to_string(),
        "exposure_scale" => bundle.exposure_scale().denominator(),
    );

    let history = persistence::history::from_config().await?;
    let service = PeakFlowService::new(InferenceEngine::new(Arc::new(bundle)), history);

    let addr = config::get("SERVER_BIND_ADDR")?;
    web::run(&addr, Arc::new(AppState::new(service))).await
}
