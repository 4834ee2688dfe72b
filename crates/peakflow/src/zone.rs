
use crate::error::RequestError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// これ以上は green
pub const GREEN_THRESHOLD: f64 = 80.0;
/// これ以上は yellow、未満は red
pub const YELLOW_THRESHOLD: f64 = 50.0;
/// 自己最良値に対する割合の上限
pub const MAX_PERCENT: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Green,
    Yellow,
    Red,
}

impl Zone {
    /// 丸める前の割合で判定する
    pub fn from_percent(percent: f64) -> Self {
        if percent >= GREEN_THRESHOLD {
            Zone::Green
        } else if percent >= YELLOW_THRESHOLD {
            Zone::Yellow
        } else {
            Zone::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Green => "green",
            Zone::Yellow => "yellow",
            Zone::Red => "red",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Zone::Green => "You can breathe easy!",
            Zone::Yellow => "You may be at moderate risk of an asthma attack",
            Zone::Red => "High risk—follow your action plan",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(Zone::Green),
            "yellow" => Ok(Zone::Yellow),
            "red" => Ok(Zone::Red),
            other => Err(format!("unknown zone: {}", other)),
        }
    }
}

/// 小数第 1 位に丸める
pub fn round1(value: f64) -> f64 {
    let scaled = value * 10.0;
    if !scaled.is_finite() {
        return value;
    }
    // ちょうど中間の値は偶数側へ丸める (0.25 -> 0.2)
    scaled.round_ties_even() / 10.0
}

/// 自己最良値に対する割合 (%)。[0, 150] に収める
pub fn peak_flow_percent(predicted: f64, personal_best: f64) -> f64 {
    (predicted / personal_best * 100.0).clamp(0.0, MAX_PERCENT)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    /// 小数第 1 位に丸めた予測値
    pub predicted_peak_flow: f64,
    /// 小数第 1 位に丸めた割合
    pub peak_flow_percent: f64,
    pub zone: Zone,
}

impl RiskAssessment {
    pub fn message(&self) -> &'static str {
        self.zone.message()
    }
}

pub fn classify(predicted: f64, personal_best: f64) -> Result<RiskAssessment, RequestError> {
    if !(personal_best.is_finite() && personal_best > 0.0) {
        return Err(RequestError::InvalidBaseline(personal_best));
    }
    if !predicted.is_finite() {
        return Err(RequestError::NonFinitePrediction(predicted));
    }

    let percent = peak_flow_percent(predicted, personal_best);
    let zone = Zone::from_percent(percent);
    Ok(RiskAssessment {
        predicted_peak_flow: round1(predicted),
        peak_flow_percent: round1(percent),
        zone,
    })
}
