#[cfg(test)]
mod tests;

use crate::Result;
use crate::exposure::{AQI_MAX, ExposureRow, ExposureTable};
use anyhow::anyhow;
use logging::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// ラベル生成に使う集団平均の自己ベスト (L/min)
pub const POPULATION_PERSONAL_BEST: f64 = 600.0;

pub const HEART_RATE_RANGE: (f64, f64) = (50.0, 160.0);
pub const RESP_RATE_RANGE: (f64, f64) = (8.0, 30.0);
pub const SPO2_RANGE: (f64, f64) = (90.0, 100.0);
pub const PEAK_FLOW_RANGE: (f64, f64) = (150.0, 650.0);

// 基準バイタルの分布 (平均, 標準偏差)
const BASE_HEART_RATE: (f64, f64) = (78.0, 8.0);
const BASE_RESP_RATE: (f64, f64) = (16.0, 2.5);
const BASE_SPO2: (f64, f64) = (97.2, 1.0);
const SPO2_NOISE: (f64, f64) = (0.0, 0.3);
const PEAK_FLOW_NOISE: (f64, f64) = (0.0, 18.0);

// これを超えると発作様の急激な低下が加わる
const ATTACK_AQI_THRESHOLD: f64 = 160.0;
const ATTACK_SLOPE: f64 = 0.8;
const HUMID_THRESHOLD: f64 = 70.0;
const HUMID_SLOPE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    pub heart_rate: f64,
    pub resp_rate: f64,
    pub spo2: f64,
}

/// 学習用の 1 行。特徴量の並びは `FEATURE_NAMES` と一致させる
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSample {
    pub vitals: Vitals,
    pub temp_c: f64,
    pub humidity: f64,
    pub aqi: f64,
    pub peak_flow: f64,
}

impl TrainingSample {
    pub fn features(&self) -> [f64; 6] {
        [
            self.vitals.heart_rate,
            self.vitals.resp_rate,
            self.vitals.spo2,
            self.temp_c,
            self.humidity,
            self.aqi,
        ]
    }
}

/// 環境要因の強さ (いずれも概ね 0〜1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effects {
    pub pollution: f64,
    pub humidity: f64,
    pub temperature: f64,
}

impl Effects {
    pub fn of(aqi: f64, humidity: f64, temp_c: f64) -> Self {
        Self {
            pollution: aqi / AQI_MAX,
            humidity: humidity / 100.0,
            // 20℃ から離れるほど大きい
            temperature: (temp_c - 20.0).abs() / 20.0,
        }
    }

    fn of_row(row: &ExposureRow) -> Self {
        Self::of(row.aqi, row.humidity, row.temp_c)
    }
}

/// 基準バイタルに環境の影響を加え、生理的な範囲に収める
pub fn perturb_vitals(base: Vitals, effects: Effects, spo2_noise: f64) -> Vitals {
    let heart_rate = base.heart_rate
        + 10.0 * effects.pollution
        + 3.0 * effects.humidity
        + 2.0 * effects.temperature;
    let resp_rate = base.resp_rate + 4.0 * effects.pollution + 1.5 * effects.humidity;
    let spo2 = base.spo2 - 2.2 * effects.pollution - 1.0 * effects.humidity + spo2_noise;

    Vitals {
        heart_rate: heart_rate.clamp(HEART_RATE_RANGE.0, HEART_RATE_RANGE.1),
        resp_rate: resp_rate.clamp(RESP_RATE_RANGE.0, RESP_RATE_RANGE.1),
        spo2: spo2.clamp(SPO2_RANGE.0, SPO2_RANGE.1),
    }
}

/// ピークフローのラベル。
///
/// 汚染・湿度・速い呼吸で下がり、酸素飽和度が高いと上がる。
/// aqi と湿度が閾値を超えた分だけ追加の低下が入る。
pub fn peak_flow_label(
    personal_best: f64,
    aqi: f64,
    humidity: f64,
    vitals: &Vitals,
    noise: f64,
) -> f64 {
    let attack_penalty = if aqi > ATTACK_AQI_THRESHOLD {
        (aqi - ATTACK_AQI_THRESHOLD) * ATTACK_SLOPE
    } else {
        0.0
    };
    let humidity_penalty = if humidity > HUMID_THRESHOLD {
        (humidity - HUMID_THRESHOLD) * HUMID_SLOPE
    } else {
        0.0
    };

    (personal_best - 0.9 * aqi - 0.35 * humidity - 8.0 * (vitals.resp_rate - 16.0).max(0.0)
        + 18.0 * (vitals.spo2 - 95.0)
        - attack_penalty
        - humidity_penalty
        + noise)
        .clamp(PEAK_FLOW_RANGE.0, PEAK_FLOW_RANGE.1)
}

fn normal((mean, std_dev): (f64, f64)) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev)
        .map_err(|e| anyhow!("invalid normal distribution N({}, {}): {}", mean, std_dev, e))
}

fn draw(rng: &mut StdRng, params: (f64, f64), n: usize) -> Result<Vec<f64>> {
    let dist = normal(params)?;
    Ok((0..n).map(|_| dist.sample(&mut *rng)).collect())
}

#[derive(Debug, Clone, Copy)]
pub struct Simulator {
    seed: u64,
    personal_best: f64,
}

impl Simulator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            personal_best: POPULATION_PERSONAL_BEST,
        }
    }

    pub fn with_personal_best(self, personal_best: f64) -> Self {
        Self {
            personal_best,
            ..self
        }
    }

    /// 同じシードと同じ入力なら常にビット単位で同じ結果を返す。
    ///
    /// 乱数は列ごとにまとめて引く (心拍 → 呼吸数 → SpO2 → SpO2 ノイズ → ラベルノイズ)。
    /// 引く順番を変えると再現性が崩れる。
    pub fn run(&self, table: &ExposureTable) -> Result<Vec<TrainingSample>> {
        let log = DEFAULT.new(o!(
            "function" => "physiology::run",
            "seed" => self.seed,
            "rows" => table.len(),
        ));

        let n = table.len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let base_hr = draw(&mut rng, BASE_HEART_RATE, n)?;
        let base_rr = draw(&mut rng, BASE_RESP_RATE, n)?;
        let base_spo2 = draw(&mut rng, BASE_SPO2, n)?;
        let spo2_noise = draw(&mut rng, SPO2_NOISE, n)?;
        let label_noise = draw(&mut rng, PEAK_FLOW_NOISE, n)?;

        let samples: Vec<TrainingSample> = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let base = Vitals {
                    heart_rate: base_hr[i],
                    resp_rate: base_rr[i],
                    spo2: base_spo2[i],
                };
                let vitals = perturb_vitals(base, Effects::of_row(row), spo2_noise[i]);
                let peak_flow = peak_flow_label(
                    self.personal_best,
                    row.aqi,
                    row.humidity,
                    &vitals,
                    label_noise[i],
                );
                TrainingSample {
                    vitals,
                    temp_c: row.temp_c,
                    humidity: row.humidity,
                    aqi: row.aqi,
                    peak_flow,
                }
            })
            .collect();

        info!(log, "simulated training samples"; "samples" => samples.len());
        Ok(samples)
    }
}
