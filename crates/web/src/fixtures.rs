use crate::{AppState, PeakFlowService};
use anyhow::anyhow;
use async_trait::async_trait;
use peakflow::bundle::{ModelBundle, RidgeRegression, StandardScaler, TrainingReport, Transform};
use peakflow::exposure::ExposureScale;
use peakflow::inference::InferenceEngine;
use persistence::history::{HistoryStore, MemoryHistory, NewPredictionRecord, PredictionRecord};
use serde_json::{Value, json};
use std::sync::Arc;

/// 予測値が `600 - aqi` になるバンドル
pub fn bundle() -> ModelBundle {
    bundle_with(vec![0.0, 0.0, 0.0, 0.0, 0.0, -1.0])
}

/// 標準化は恒等、切片 600 のバンドル
pub fn bundle_with(coefficients: Vec<f64>) -> ModelBundle {
    let transform = Transform {
        scaler: StandardScaler {
            mean: vec![0.0; 6],
            scale: vec![1.0; 6],
        },
        regression: RidgeRegression {
            alpha: 2.0,
            coefficients,
            intercept: 600.0,
        },
    };
    let report = TrainingReport {
        mae: 0.0,
        r2: 1.0,
        train_rows: 8,
        test_rows: 2,
    };
    ModelBundle::new(transform, ExposureScale::new(100.0), report)
}

pub fn engine() -> InferenceEngine {
    InferenceEngine::new(Arc::new(bundle()))
}

pub fn request(aqi: f64, personal_best: f64) -> Value {
    json!({
        "heartRate": 80,
        "respRate": 16,
        "spo2": 97,
        "tempC": 21,
        "humidity": 50,
        "aqi": aqi,
        "personalBestPeakFlow": personal_best,
    })
}

/// 書き込みも読み出しも失敗する保存先
pub struct FailingHistory;

#[async_trait]
impl HistoryStore for FailingHistory {
    async fn append(&self, _record: NewPredictionRecord) -> anyhow::Result<()> {
        Err(anyhow!("connection refused"))
    }

    async fn recent(&self, _limit: i64) -> anyhow::Result<Vec<PredictionRecord>> {
        Err(anyhow!("connection refused"))
    }
}

pub fn memory_service() -> (PeakFlowService, Arc<MemoryHistory>) {
    let store = Arc::new(MemoryHistory::new());
    let service = PeakFlowService::new(engine(), store.clone());
    (service, store)
}

pub fn state(service: PeakFlowService) -> Arc<AppState> {
    Arc::new(AppState::new(service))
}
