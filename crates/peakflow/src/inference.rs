
use crate::bundle::ModelBundle;
use crate::error::RequestError;
use serde_json::{Map, Value};
use std::sync::Arc;

/// JSON の値を有限な数値として読む。数値文字列も受け付ける
pub fn parse_number(field: &str, value: &Value) -> Result<f64, RequestError> {
    let invalid = |detail: String| RequestError::InvalidInputType {
        field: field.to_string(),
        detail,
    };

    let parsed = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{} is not representable as f64", n)))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(format!("could not convert string to float: {:?} ({})", s, e)))?,
        other => return Err(invalid(format!("expected a number, got {}", other))),
    };

    if !parsed.is_finite() {
        return Err(invalid(format!("value must be finite, got {}", parsed)));
    }
    Ok(parsed)
}

/// 学習済みバンドルを使った推論。状態を持たないので複数スレッドから同時に呼んでよい
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    bundle: Arc<ModelBundle>,
}

impl InferenceEngine {
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// バンドルが要求する特徴量のうち入力に無いもの (バンドルの順)
    pub fn missing_fields(&self, input: &Map<String, Value>) -> Vec<String> {
        self.bundle
            .feature_names()
            .iter()
            .filter(|name| !input.contains_key(name.as_str()))
            .cloned()
            .collect()
    }

    /// 入力の並びではなく、バンドルに記録された順で特徴量ベクトルを組み立てる
    pub fn feature_vector(&self, input: &Map<String, Value>) -> Result<Vec<f64>, RequestError> {
        let missing = self.missing_fields(input);
        if !missing.is_empty() {
            return Err(RequestError::MissingFields(missing));
        }

        self.bundle
            .feature_names()
            .iter()
            .map(|name| parse_number(name, &input[name.as_str()]))
            .collect()
    }

    /// 各値が有限でも組み合わせ次第で予測が有限でなくなる。その場合は入力エラー
    pub fn predict(&self, input: &Map<String, Value>) -> Result<f64, RequestError> {
        let row = self.feature_vector(input)?;
        let predicted = self.bundle.predict_row(&row);
        if !predicted.is_finite() {
            return Err(RequestError::NonFinitePrediction(predicted));
        }
        Ok(predicted)
    }
}
