use crate::Result;
use anyhow::anyhow;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

// TOML configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_bundle_path")]
    pub bundle_path: String,
}

#[derive(Debug, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    #[serde(default = "default_ridge_alpha")]
    pub ridge_alpha: f64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_backend")]
    pub backend: String,
    #[serde(default)]
    pub pg_dsn: String,
    #[serde(default = "default_pg_pool_size")]
    pub pg_pool_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_rust_log_format")]
    pub rust_log_format: String,
}

// Default values
fn default_bind_addr() -> String {
    "0.0.0.0:5001".to_string()
}
fn default_bundle_path() -> String {
    "peakflow_model.json".to_string()
}
fn default_csv_path() -> String {
    "AirQualityUCI.csv".to_string()
}
fn default_seed() -> u64 {
    42
}
fn default_test_ratio() -> f64 {
    0.2
}
fn default_ridge_alpha() -> f64 {
    2.0
}
fn default_history_backend() -> String {
    "postgres".to_string()
}
fn default_pg_pool_size() -> usize {
    16
}
fn default_rust_log_format() -> String {
    "json".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            bundle_path: default_bundle_path(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            seed: default_seed(),
            test_ratio: default_test_ratio(),
            ridge_alpha: default_ridge_alpha(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: default_history_backend(),
            pg_dsn: String::new(),
            pg_pool_size: default_pg_pool_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log_format: default_rust_log_format(),
        }
    }
}

static CONFIG: Lazy<Config> = Lazy::new(|| {
    load_config().unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config files: {}. Using defaults.",
            e
        );
        Config::default()
    })
});

static CONFIG_STORE: Lazy<Arc<Mutex<HashMap<String, String>>>> =
    Lazy::new(|| Arc::new(Mutex::new(HashMap::new())));

pub fn get(name: &str) -> Result<String> {
    // Priority 1: CONFIG_STORE (runtime overrides)
    if let Some(value) = get_from_store(name) {
        if value.is_empty() {
            return Err(anyhow!("{} is empty", name));
        }
        return Ok(value);
    }

    // Priority 2: Environment variables
    if let Ok(val) = std::env::var(name)
        && !val.is_empty()
    {
        return Ok(val);
    }

    // Priority 3: TOML config
    let toml_value = match name {
        "SERVER_BIND_ADDR" => Some(CONFIG.server.bind_addr.clone()),
        "MODEL_BUNDLE_PATH" => Some(CONFIG.model.bundle_path.clone()),
        "TRAINING_CSV_PATH" => Some(CONFIG.training.csv_path.clone()),
        "TRAINING_SEED" => Some(CONFIG.training.seed.to_string()),
        "TRAINING_TEST_RATIO" => Some(CONFIG.training.test_ratio.to_string()),
        "RIDGE_ALPHA" => Some(CONFIG.training.ridge_alpha.to_string()),
        "HISTORY_BACKEND" => Some(CONFIG.history.backend.clone()),
        "PG_DSN" => Some(CONFIG.history.pg_dsn.clone()),
        "PG_POOL_SIZE" => Some(CONFIG.history.pg_pool_size.to_string()),
        "RUST_LOG_FORMAT" => Some(CONFIG.logging.rust_log_format.clone()),
        _ => None,
    };

    if let Some(value) = toml_value
        && !value.is_empty()
    {
        return Ok(value);
    }

    Err(anyhow!("Configuration key not found: {}", name))
}

/// 値を取得してパースする。未設定またはパース失敗時は `default` を返す
pub fn get_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    get(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// テスト用: 設定値を上書きする
///
/// 注: `#[cfg(test)]` にすると他クレートのテストから参照できないため
/// `#[doc(hidden)]` で公開している
#[doc(hidden)]
pub fn set(name: &str, value: &str) {
    if let Ok(mut store) = CONFIG_STORE.lock() {
        store.insert(name.to_string(), value.to_string());
    }
}

/// テスト用: 設定値を CONFIG_STORE から削除する
#[doc(hidden)]
pub fn remove(name: &str) {
    if let Ok(mut store) = CONFIG_STORE.lock() {
        store.remove(name);
    }
}

/// テスト用: CONFIG_STORE に値をセットし、Drop 時に自動で元に戻す RAII ガード。
///
/// テストが途中で panic しても確実にクリーンアップされる。
#[doc(hidden)]
pub struct ConfigGuard {
    key: String,
    previous: Option<String>,
}

impl ConfigGuard {
    pub fn new(key: &str, value: &str) -> Self {
        let previous = get_from_store(key);
        set(key, value);
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(prev) => set(&self.key, prev),
            None => remove(&self.key),
        }
    }
}

fn get_from_store(name: &str) -> Option<String> {
    if let Ok(store) = CONFIG_STORE.lock() {
        store.get(name).cloned()
    } else {
        None
    }
}

/// Load configuration from TOML files with priority:
/// 1. config/config.local.toml (git-ignored, for local overrides)
/// 2. config/config.toml (git-managed template)
/// 3. Default values
fn load_config() -> Result<Config> {
    let mut config = Config::default();

    let base_path = "config/config.toml";
    if Path::new(base_path).exists() {
        let content = fs::read_to_string(base_path)?;
        config = toml::from_str(&content)?;
    }

    let local_path = "config/config.local.toml";
    if Path::new(local_path).exists() {
        let content = fs::read_to_string(local_path)?;
        let local_config: Config = toml::from_str(&content)?;
        merge_config(&mut config, local_config);
    }

    Ok(config)
}

/// Merge local config into base config (local values override base values)
fn merge_config(base: &mut Config, local: Config) {
    // Server
    if local.server.bind_addr != default_bind_addr() {
        base.server.bind_addr = local.server.bind_addr;
    }

    // Model
    if local.model.bundle_path != default_bundle_path() {
        base.model.bundle_path = local.model.bundle_path;
    }

    // Training
    if local.training.csv_path != default_csv_path() {
        base.training.csv_path = local.training.csv_path;
    }
    if local.training.seed != default_seed() {
        base.training.seed = local.training.seed;
    }
    if local.training.test_ratio != default_test_ratio() {
        base.training.test_ratio = local.training.test_ratio;
    }
    if local.training.ridge_alpha != default_ridge_alpha() {
        base.training.ridge_alpha = local.training.ridge_alpha;
    }

    // History
    if local.history.backend != default_history_backend() {
        base.history.backend = local.history.backend;
    }
    if !local.history.pg_dsn.is_empty() {
        base.history.pg_dsn = local.history.pg_dsn;
    }
    if local.history.pg_pool_size != default_pg_pool_size() {
        base.history.pg_pool_size = local.history.pg_pool_size;
    }

    // Logging
    if local.logging.rust_log_format != default_rust_log_format() {
        base.logging.rust_log_format = local.logging.rust_log_format;
    }
}

/// Get TOML-based configuration
pub fn config() -> &'static Config {
    &CONFIG
}
