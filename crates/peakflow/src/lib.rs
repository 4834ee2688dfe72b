#![deny(warnings)]

pub mod bundle;
pub mod error;
pub mod exposure;
pub mod features;
pub mod inference;
pub mod physiology;
pub mod trainer;
pub mod zone;

type Result<T> = anyhow::Result<T>;

/// 推論時に受け付ける特徴量の並び。バンドルにもこの順で記録される
pub const FEATURE_NAMES: [&str; 6] = ["heartRate", "respRate", "spo2", "tempC", "humidity", "aqi"];

/// リクエストで受け取る自己ベスト値のキー
pub const PERSONAL_BEST_FIELD: &str = "personalBestPeakFlow";
