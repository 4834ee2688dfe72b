#[cfg(test)]
mod tests;

use crate::Result;
use common::api::{HistoryEntry, PredictResponse};
use logging::*;
use peakflow::PERSONAL_BEST_FIELD;
use peakflow::error::RequestError;
use peakflow::inference::{self, InferenceEngine};
use peakflow::zone::{self, RiskAssessment};
use persistence::history::{self, HistoryStore, NewPredictionRecord};
use serde_json::Value;
use std::sync::Arc;

/// 履歴への保存結果。失敗しても判定結果は呼び出し元へ返す
#[derive(Debug, Clone, PartialEq)]
pub enum Persisted {
    Saved,
    Warning(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub risk: RiskAssessment,
    pub persisted: Persisted,
}

impl Assessment {
    pub fn to_response(&self) -> PredictResponse {
        PredictResponse {
            predicted_peak_flow: self.risk.predicted_peak_flow,
            peak_flow_percent: self.risk.peak_flow_percent,
            zone: self.risk.zone.to_string(),
            message: self.risk.message().to_string(),
            warning: match &self.persisted {
                Persisted::Saved => None,
                Persisted::Warning(w) => Some(w.clone()),
            },
        }
    }
}

/// 推論エンジンと履歴の保存先をまとめたもの。起動時に一度だけ作る
#[derive(Clone)]
pub struct PeakFlowService {
    engine: InferenceEngine,
    history: Arc<dyn HistoryStore>,
}

impl PeakFlowService {
    pub fn new(engine: InferenceEngine, history: Arc<dyn HistoryStore>) -> Self {
        Self { engine, history }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// リクエストに必要なキー (特徴量 + 自己ベスト値)
    pub fn required_fields(&self) -> Vec<String> {
        self.engine
            .bundle()
            .feature_names()
            .iter()
            .cloned()
            .chain(std::iter::once(PERSONAL_BEST_FIELD.to_string()))
            .collect()
    }

    /// 入力を検証して推論・判定し、結果を履歴に追記する。
    /// 入力エラーのときは何も記録しない
    pub async fn assess(&self, body: &Value) -> std::result::Result<Assessment, RequestError> {
        let log = DEFAULT.new(o!("function" => "PeakFlowService::assess"));

        let input = body.as_object().ok_or(RequestError::NotAnObject)?;

        let missing: Vec<String> = self
            .required_fields()
            .into_iter()
            .filter(|name| !input.contains_key(name))
            .collect();
        if !missing.is_empty() {
            debug!(log, "rejected request"; "missing" => ?missing);
            return Err(RequestError::MissingFields(missing));
        }

        let predicted = self.engine.predict(input)?;
        let personal_best = inference::parse_number(PERSONAL_BEST_FIELD, &input[PERSONAL_BEST_FIELD])?;
        let risk = zone::classify(predicted, personal_best)?;

        let record = NewPredictionRecord::now(
            risk.predicted_peak_flow,
            risk.peak_flow_percent,
            risk.zone.as_str(),
        );
        let persisted = match self.history.append(record).await {
            Ok(()) => Persisted::Saved,
            Err(e) => {
                warn!(log, "failed to save prediction"; "error" => %e);
                Persisted::Warning(format!("Prediction save failed: {}", e))
            }
        };

        info!(log, "assessed";
            "predicted_peak_flow" => risk.predicted_peak_flow,
            "peak_flow_percent" => risk.peak_flow_percent,
            "zone" => risk.zone.as_str(),
        );
        Ok(Assessment { risk, persisted })
    }

    /// 新しい順の履歴。`limit` は [1, 500] に丸め、未指定なら 50 件
    pub async fn recent(&self, limit: Option<i64>) -> Result<Vec<HistoryEntry>> {
        let records = self.history.recent(history::clamp_limit(limit)).await?;
        Ok(records
            .into_iter()
            .map(|r| HistoryEntry {
                ts: r.ts,
                predicted_peak_flow: r.predicted_peak_flow,
                peak_flow_percent: r.peak_flow_percent,
                zone: r.zone,
            })
            .collect())
    }
}
