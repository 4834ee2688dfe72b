
use crate::Result;
use crate::bundle::{ModelBundle, RidgeRegression, StandardScaler, TrainingReport, Transform};
use crate::error::TrainingDataError;
use crate::exposure::{self, ExposureScale};
use crate::features::{self, RawTable};
use crate::physiology::{Simulator, TrainingSample};
use anyhow::anyhow;
use common::config;
use logging::*;
use linfa::prelude::*;
use linfa_elasticnet::ElasticNet;
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// これ未満の標準偏差は定数列とみなし、スケールを 1 にする
const MIN_STD: f64 = 10.0 * f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    pub simulation_seed: u64,
    pub split_seed: u64,
    pub test_ratio: f64,
    pub alpha: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            simulation_seed: 42,
            split_seed: 42,
            test_ratio: 0.2,
            alpha: 2.0,
        }
    }
}

impl TrainingOptions {
    pub fn from_config() -> Self {
        let defaults = Self::default();
        let seed = config::get_or("TRAINING_SEED", defaults.simulation_seed);
        Self {
            simulation_seed: seed,
            split_seed: seed,
            test_ratio: config::get_or("TRAINING_TEST_RATIO", defaults.test_ratio),
            alpha: config::get_or("RIDGE_ALPHA", defaults.alpha),
        }
    }
}

/// シード付きでシャッフルし (評価用, 学習用) の添字に分ける。
/// 評価用の件数は `ceil(n * test_ratio)`
pub fn split_indices(n: usize, test_ratio: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(anyhow!(TrainingDataError::InvalidTestRatio(test_ratio)));
    }
    let n_test = (n as f64 * test_ratio).ceil() as usize;
    if n < 2 || n_test >= n {
        return Err(anyhow!(TrainingDataError::InsufficientData {
            required: 2,
            actual: n,
        }));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((indices, train))
}

fn to_matrix(samples: &[TrainingSample], indices: &[usize]) -> Result<(Array2<f64>, Array1<f64>)> {
    let n_features = crate::FEATURE_NAMES.len();
    let mut data = Vec::with_capacity(indices.len() * n_features);
    let mut targets = Vec::with_capacity(indices.len());
    for &i in indices {
        data.extend_from_slice(&samples[i].features());
        targets.push(samples[i].peak_flow);
    }
    let x = Array2::from_shape_vec((indices.len(), n_features), data).map_err(|e| {
        anyhow!(TrainingDataError::Fit(format!(
            "failed to convert features to ndarray: {}",
            e
        )))
    })?;
    Ok((x, Array1::from_vec(targets)))
}

/// 学習用データのみから平均と母標準偏差を求める
pub fn fit_scaler(x: &Array2<f64>) -> Result<StandardScaler> {
    let mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| anyhow!(TrainingDataError::InsufficientData { required: 1, actual: 0 }))?;
    let std = x.std_axis(Axis(0), 0.0);
    let scale = std
        .iter()
        .map(|s| if *s < MIN_STD { 1.0 } else { *s })
        .collect();
    Ok(StandardScaler {
        mean: mean.to_vec(),
        scale,
    })
}

fn standardize(x: &Array2<f64>, scaler: &StandardScaler) -> Array2<f64> {
    let mean = Array1::from_vec(scaler.mean.clone());
    let scale = Array1::from_vec(scaler.scale.clone());
    (x - &mean) / &scale
}

/// 座標降下の反復上限と収束判定
const MAX_ITERATIONS: u32 = 5_000;
const TOLERANCE: f64 = 1e-10;

/// 切片付きリッジ回帰: ‖y - Zw - b‖² + α‖w‖² を最小化する。
/// linfa の目的関数は残差を 1/(2n) 倍するので、罰則は α/n で渡す
pub fn fit_ridge(z: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<RidgeRegression> {
    let log = DEFAULT.new(o!("function" => "trainer::fit_ridge", "alpha" => alpha));

    let n = z.nrows();
    if n == 0 || n != y.len() {
        return Err(anyhow!(TrainingDataError::Fit(format!(
            "shape mismatch: {} rows of features, {} targets",
            n,
            y.len()
        ))));
    }

    let dataset = Dataset::new(z.clone(), y.clone());
    let model = ElasticNet::ridge()
        .penalty(alpha / n as f64)
        .with_intercept(true)
        .max_iterations(MAX_ITERATIONS)
        .tolerance(TOLERANCE)
        .fit(&dataset)
        .map_err(|e| {
            anyhow!(TrainingDataError::Fit(format!(
                "Failed to train ridge model: {}",
                e
            )))
        })?;

    debug!(log, "ridge fitted"; "intercept" => model.intercept());
    Ok(RidgeRegression {
        alpha,
        coefficients: model.hyperplane().to_vec(),
        intercept: model.intercept(),
    })
}

/// 評価用データでの MAE と決定係数
pub fn evaluate(transform: &Transform, x: &Array2<f64>, y: &Array1<f64>) -> Result<(f64, f64)> {
    let predictions: Array1<f64> = x
        .rows()
        .into_iter()
        .map(|row| transform.predict_row(&row.to_vec()))
        .collect();

    let metric_error = |e: linfa::Error| {
        anyhow!(TrainingDataError::Fit(format!(
            "Failed to evaluate model: {}",
            e
        )))
    };
    let mae = predictions.mean_absolute_error(y).map_err(metric_error)?;
    let r2 = predictions.r2(y).map_err(metric_error)?;
    Ok((mae, r2))
}

/// シミュレーション済みのデータから標準化 + リッジ回帰を学習し、バンドルを作る
pub fn train(
    samples: &[TrainingSample],
    exposure_scale: ExposureScale,
    options: &TrainingOptions,
) -> Result<ModelBundle> {
    let log = DEFAULT.new(o!(
        "function" => "trainer::train",
        "samples" => samples.len(),
        "alpha" => options.alpha,
        "test_ratio" => options.test_ratio,
        "split_seed" => options.split_seed,
    ));

    let (test_idx, train_idx) = split_indices(samples.len(), options.test_ratio, options.split_seed)?;
    let (x_train, y_train) = to_matrix(samples, &train_idx)?;
    let (x_test, y_test) = to_matrix(samples, &test_idx)?;

    let scaler = fit_scaler(&x_train)?;
    let z_train = standardize(&x_train, &scaler);
    let regression = fit_ridge(&z_train, &y_train, options.alpha)?;
    let transform = Transform { scaler, regression };

    let (mae, r2) = evaluate(&transform, &x_test, &y_test)?;
    info!(log, "model trained";
        "train_rows" => train_idx.len(),
        "test_rows" => test_idx.len(),
        "mae" => mae,
        "r2" => r2,
    );

    let report = TrainingReport {
        mae,
        r2,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
    };
    Ok(ModelBundle::new(transform, exposure_scale, report))
}

/// 読み込み済みの表から バンドル生成までを一括で行う。どの段で失敗しても全体を中断する
pub fn run_pipeline(raw: &RawTable, options: &TrainingOptions) -> Result<ModelBundle> {
    let log = DEFAULT.new(o!("function" => "trainer::run_pipeline"));

    let clean = features::prepare(raw);
    let table = exposure::aggregate(&clean.observations)?;
    let samples = Simulator::new(options.simulation_seed).run(&table)?;
    let bundle = train(&samples, table.scale, options)?;

    info!(log, "pipeline finished";
        "bundle_id" => bundle.id().to_string(),
        "rows" => clean.observations.len(),
        "dropped_rows" => clean.dropped_rows,
        "exposure_scale" => table.scale.denominator(),
    );
    Ok(bundle)
}
