
use crate::FEATURE_NAMES;
use crate::Result;
use crate::error::BundleError;
use crate::exposure::ExposureScale;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use logging::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// 特徴量ごとの標準化 (平均 0、分散 1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

/// L2 正則化付き線形回帰の係数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl RidgeRegression {
    pub fn predict(&self, standardized: &[f64]) -> f64 {
        let dot: f64 = standardized
            .iter()
            .zip(self.coefficients.iter())
            .map(|(z, w)| z * w)
            .sum();
        dot + self.intercept
    }
}

/// 標準化 → 線形回帰 の 2 段変換
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scaler: StandardScaler,
    pub regression: RidgeRegression,
}

impl Transform {
    /// `row` は学習時と同じ特徴量順であること
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.regression.predict(&self.scaler.transform(row))
    }
}

/// 評価用データでの診断値。バンドル生成の可否には使わない
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub mae: f64,
    pub r2: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// 学習済みモデル一式。保存後は変更しない
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    id: Uuid,
    created_at: DateTime<Utc>,
    feature_names: Vec<String>,
    transform: Transform,
    exposure_scale: ExposureScale,
    report: TrainingReport,
}

impl ModelBundle {
    pub fn new(transform: Transform, exposure_scale: ExposureScale, report: TrainingReport) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            transform,
            exposure_scale,
            report,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn exposure_scale(&self) -> ExposureScale {
        self.exposure_scale
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.transform.predict_row(row)
    }

    /// 特徴量名と各パラメータの長さ・有限性を検査する
    pub fn validate(&self) -> std::result::Result<(), BundleError> {
        let expected: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        if self.feature_names != expected {
            return Err(BundleError::FeatureNames {
                expected,
                actual: self.feature_names.clone(),
            });
        }

        let scaler = &self.transform.scaler;
        let regression = &self.transform.regression;
        let n = self.feature_names.len();
        if scaler.mean.len() != n || scaler.scale.len() != n || regression.coefficients.len() != n
        {
            return Err(BundleError::ShapeMismatch {
                names: n,
                means: scaler.mean.len(),
                scales: scaler.scale.len(),
                coefficients: regression.coefficients.len(),
            });
        }

        if !scaler.mean.iter().all(|v| v.is_finite()) {
            return Err(BundleError::NonFinite("scaler.mean"));
        }
        // 0 除算を避けるため scale は正であることも要求する
        if !scaler.scale.iter().all(|v| v.is_finite() && *v > 0.0) {
            return Err(BundleError::NonFinite("scaler.scale"));
        }
        if !regression.coefficients.iter().all(|v| v.is_finite()) {
            return Err(BundleError::NonFinite("regression.coefficients"));
        }
        if !regression.intercept.is_finite() {
            return Err(BundleError::NonFinite("regression.intercept"));
        }
        if !self.exposure_scale.denominator().is_finite() {
            return Err(BundleError::NonFinite("exposure_scale"));
        }
        Ok(())
    }

    /// 一時ファイルに書いてから rename する。途中で失敗しても中途半端なバンドルは残らない
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let log = DEFAULT.new(o!(
            "function" => "ModelBundle::save",
            "path" => path.display().to_string(),
            "bundle_id" => self.id.to_string(),
        ));

        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, json).map_err(|e| anyhow!("failed to write bundle: {}", e))?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(anyhow!("failed to move bundle into place: {}", e));
        }

        info!(log, "model bundle saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let log = DEFAULT.new(o!(
            "function" => "ModelBundle::load",
            "path" => path.display().to_string(),
        ));

        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read bundle {}: {}", path.display(), e))?;
        let bundle: ModelBundle = serde_json::from_str(&content)?;
        bundle.validate()?;

        info!(log, "model bundle loaded";
            "bundle_id" => bundle.id.to_string(),
            "created_at" => %bundle.created_at,
            "mae" => bundle.report.mae,
            "r2" => bundle.report.r2,
        );
        Ok(bundle)
    }
}
