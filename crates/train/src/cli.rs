
use clap::Parser;
use common::config;
use peakflow::trainer::TrainingOptions;
use std::path::PathBuf;

/// 未指定の引数は設定 (環境変数 / config.toml) から補う
#[derive(Parser, Debug, Clone)]
#[command(name = "train", about = "Train the peak-flow model from air-quality observations")]
pub struct Cli {
    /// Air-quality CSV (`;` with decimal comma, or `,` with decimal point)
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Output path of the model bundle (JSON)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Seed for the physiology simulation and the train/test split
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of rows held out for evaluation (0.0-1.0, exclusive)
    #[arg(long)]
    pub test_ratio: Option<f64>,

    /// L2 penalty of the ridge regression
    #[arg(long)]
    pub alpha: Option<f64>,
}

impl Cli {
    pub fn csv_path(&self) -> anyhow::Result<PathBuf> {
        match &self.csv {
            Some(path) => Ok(path.clone()),
            None => Ok(PathBuf::from(config::get("TRAINING_CSV_PATH")?)),
        }
    }

    pub fn output_path(&self) -> anyhow::Result<PathBuf> {
        match &self.output {
            Some(path) => Ok(path.clone()),
            None => Ok(PathBuf::from(config::get("MODEL_BUNDLE_PATH")?)),
        }
    }

    pub fn options(&self) -> TrainingOptions {
        let base = TrainingOptions::from_config();
        TrainingOptions {
            simulation_seed: self.seed.unwrap_or(base.simulation_seed),
            split_seed: self.seed.unwrap_or(base.split_seed),
            test_ratio: self.test_ratio.unwrap_or(base.test_ratio),
            alpha: self.alpha.unwrap_or(base.alpha),
        }
    }
}
