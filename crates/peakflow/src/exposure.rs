
use crate::Result;
use crate::error::TrainingDataError;
use crate::features::Observation;
use anyhow::anyhow;
use logging::*;
use serde::{Deserialize, Serialize};

/// 直近の曝露 (時間単位のデータなら約 6 時間)
pub const SHORT_WINDOW: usize = 6;
/// 一日分の曝露
pub const LONG_WINDOW: usize = 24;

const SCALE_PERCENTILE: f64 = 95.0;
const SCALE_FLOOR: f64 = 1e-6;
/// p95 がこの値になるようにスケールする
const AQI_REFERENCE: f64 = 150.0;
pub const AQI_MAX: f64 = 250.0;

/// 汚染物質の重み付き和。負の測定値は 0 に丸めてから重みを掛ける
pub fn exposure_index(obs: &Observation) -> f64 {
    0.35 * obs.no2.max(0.0)
        + 0.35 * obs.nox.max(0.0)
        + 0.20 * obs.co.max(0.0) * 10.0
        + 0.10 * obs.benzene.max(0.0) * 10.0
}

/// 後方移動平均。最低 1 点で計算するため先頭にも欠損は生じない
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// 線形補間によるパーセンタイル (numpy の既定と同じ方式)
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// 24 点移動平均を aqi 相当の値へ変換するための分母。
///
/// 学習時に決まる特徴量の契約の一部なのでバンドルに保存する。
/// 推論時の aqi は外部で算出された値をそのまま受け取り、この値は適用しない。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExposureScale(f64);

impl ExposureScale {
    pub fn new(denominator: f64) -> Self {
        Self(denominator.max(SCALE_FLOOR))
    }

    pub fn from_series(rolling24: &[f64]) -> Option<Self> {
        percentile(rolling24, SCALE_PERCENTILE).map(Self::new)
    }

    pub fn denominator(&self) -> f64 {
        self.0
    }

    pub fn apply(&self, rolling24: f64) -> f64 {
        (rolling24 / self.0 * AQI_REFERENCE).clamp(0.0, AQI_MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureRow {
    pub observation: Observation,
    pub exposure_index: f64,
    pub rolling6: f64,
    pub rolling24: f64,
    pub aqi: f64,
    pub temp_c: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExposureTable {
    pub rows: Vec<ExposureRow>,
    pub scale: ExposureScale,
}

impl ExposureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 集計の入力となった観測値を取り出す
    pub fn observations(&self) -> Vec<Observation> {
        self.rows.iter().map(|r| r.observation).collect()
    }
}

/// 曝露指数 → 6 点平均 → 24 点平均 → スケーリングの順で集計する
pub fn aggregate(observations: &[Observation]) -> Result<ExposureTable> {
    let log = DEFAULT.new(o!(
        "function" => "exposure::aggregate",
        "rows" => observations.len(),
    ));

    if observations.is_empty() {
        return Err(anyhow!(TrainingDataError::InsufficientData {
            required: 1,
            actual: 0,
        }));
    }

    let index: Vec<f64> = observations.iter().map(exposure_index).collect();
    let rolling6 = rolling_mean(&index, SHORT_WINDOW);
    let rolling24 = rolling_mean(&index, LONG_WINDOW);
    let scale = ExposureScale::from_series(&rolling24).ok_or_else(|| {
        anyhow!(TrainingDataError::InsufficientData {
            required: 1,
            actual: 0,
        })
    })?;

    info!(log, "exposure scale computed"; "p95_denominator" => scale.denominator());

    let rows = observations
        .iter()
        .enumerate()
        .map(|(i, obs)| ExposureRow {
            observation: *obs,
            exposure_index: index[i],
            rolling6: rolling6[i],
            rolling24: rolling24[i],
            aqi: scale.apply(rolling24[i]),
            temp_c: obs.temp_c,
            humidity: obs.humidity.clamp(0.0, 100.0),
        })
        .collect();

    Ok(ExposureTable { rows, scale })
}
