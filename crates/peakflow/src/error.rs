use thiserror::Error;

/// 呼び出し元に返す入力エラー。HTTP 層では 400 になる
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Missing fields: {0:?}")]
    MissingFields(Vec<String>),

    #[error("Bad input types. Make sure inputs are numbers. Details: {field}: {detail}")]
    InvalidInputType { field: String, detail: String },

    #[error("personalBestPeakFlow must be > 0 (got {0})")]
    InvalidBaseline(f64),

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("Inputs are out of range: predicted peak flow is not finite ({0})")]
    NonFinitePrediction(f64),
}

#[derive(Error, Debug)]
pub enum TrainingDataError {
    #[error("insufficient data for training: need at least {required} rows but got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid test ratio: {0} (must be within (0, 1))")]
    InvalidTestRatio(f64),

    #[error("failed to parse training data: {0}")]
    Parse(String),

    #[error("model fitting failed: {0}")]
    Fit(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum BundleError {
    #[error(
        "parameter shape mismatch: {names} feature names, {means} means, {scales} scales, {coefficients} coefficients"
    )]
    ShapeMismatch {
        names: usize,
        means: usize,
        scales: usize,
        coefficients: usize,
    },

    #[error("unexpected feature names: expected {expected:?}, got {actual:?}")]
    FeatureNames {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("non-finite parameter in {0}")]
    NonFinite(&'static str),
}
