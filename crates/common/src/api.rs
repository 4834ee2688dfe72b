use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// `POST /predict` のレスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub predicted_peak_flow: f64,
    pub peak_flow_percent: f64,
    pub zone: String,
    pub message: String,
    /// 履歴の保存に失敗した場合のみ付与される
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// `GET /history` の 1 件分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub ts: NaiveDateTime,
    pub predicted_peak_flow: f64,
    pub peak_flow_percent: f64,
    pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_response_field_names() {
        let res = PredictResponse {
            predicted_peak_flow: 480.0,
            peak_flow_percent: 80.0,
            zone: "green".to_string(),
            message: "You can breathe easy!".to_string(),
            warning: None,
        };
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["predictedPeakFlow"], 480.0);
        assert_eq!(json["peakFlowPercent"], 80.0);
        assert_eq!(json["zone"], "green");
        // warning は None のとき出力しない
        assert!(json.get("warning").is_none());
    }

    #[test]
    fn test_predict_response_with_warning() {
        let res = PredictResponse {
            predicted_peak_flow: 300.0,
            peak_flow_percent: 50.0,
            zone: "yellow".to_string(),
            message: "You may be at moderate risk of an asthma attack".to_string(),
            warning: Some("Prediction save failed: connection refused".to_string()),
        };
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(
            json["warning"],
            "Prediction save failed: connection refused"
        );
    }
}
