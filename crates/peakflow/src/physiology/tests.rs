use super::*;
use crate::exposure::aggregate;
use crate::features::Observation;
use assertables::*;
use proptest::prelude::*;

fn calm_vitals() -> Vitals {
    Vitals {
        heart_rate: 78.0,
        resp_rate: 16.0,
        spo2: 95.0,
    }
}

fn exposure_table(n: usize) -> ExposureTable {
    let observations: Vec<Observation> = (0..n)
        .map(|i| {
            let x = i as f64;
            Observation {
                co: 1.0 + (x * 0.3).cos(),
                nox: 120.0 + (x * 0.2).sin() * 80.0,
                no2: 60.0 + x % 13.0,
                benzene: 6.0,
                temp_c: 5.0 + x % 25.0,
                humidity: 30.0 + (x * 7.0) % 60.0,
            }
        })
        .collect();
    aggregate(&observations).unwrap()
}

#[test]
fn test_peak_flow_label_baseline() {
    // 環境負荷ゼロ、呼吸数 16、SpO2 95 ならノイズ以外は自己ベストのまま
    let v = peak_flow_label(600.0, 0.0, 0.0, &calm_vitals(), 0.0);
    assert_eq!(v, 600.0);
}

#[test]
fn test_peak_flow_label_threshold_penalties() {
    let vitals = calm_vitals();
    // 閾値ちょうどでは追加ペナルティなし
    let at_threshold = peak_flow_label(600.0, 160.0, 70.0, &vitals, 0.0);
    assert_in_delta!(at_threshold, 600.0 - 0.9 * 160.0 - 0.35 * 70.0, 1e-9);

    // 閾値を 10 超えると aqi 側 8.0、湿度側 6.0 が追加で引かれる
    let above = peak_flow_label(600.0, 170.0, 80.0, &vitals, 0.0);
    let linear_only = 600.0 - 0.9 * 170.0 - 0.35 * 80.0;
    assert_in_delta!(above, linear_only - 8.0 - 6.0, 1e-9);
}

#[test]
fn test_peak_flow_label_respiratory_and_oxygen_terms() {
    let fast = Vitals {
        resp_rate: 20.0,
        ..calm_vitals()
    };
    assert_in_delta!(peak_flow_label(600.0, 0.0, 0.0, &fast, 0.0), 568.0, 1e-9);

    // 呼吸数が 16 未満でも加点はしない
    let slow = Vitals {
        resp_rate: 12.0,
        ..calm_vitals()
    };
    assert_eq!(peak_flow_label(600.0, 0.0, 0.0, &slow, 0.0), 600.0);

    let oxygenated = Vitals {
        spo2: 97.0,
        ..calm_vitals()
    };
    assert_in_delta!(peak_flow_label(600.0, 0.0, 0.0, &oxygenated, 0.0), 636.0, 1e-9);
}

#[test]
fn test_peak_flow_label_clipped() {
    let vitals = calm_vitals();
    assert_eq!(peak_flow_label(600.0, 250.0, 100.0, &vitals, -500.0), 150.0);
    assert_eq!(peak_flow_label(600.0, 0.0, 0.0, &vitals, 500.0), 650.0);
}

#[test]
fn test_perturb_vitals_effects() {
    let base = calm_vitals();
    let effects = Effects::of(250.0, 100.0, 40.0);
    assert_eq!(effects.pollution, 1.0);
    assert_eq!(effects.humidity, 1.0);
    assert_eq!(effects.temperature, 1.0);

    let v = perturb_vitals(base, effects, 0.0);
    assert_in_delta!(v.heart_rate, 78.0 + 10.0 + 3.0 + 2.0, 1e-9);
    assert_in_delta!(v.resp_rate, 16.0 + 4.0 + 1.5, 1e-9);
    assert_in_delta!(v.spo2, 95.0 - 2.2 - 1.0, 1e-9);
}

#[test]
fn test_simulation_is_reproducible() {
    let table = exposure_table(200);
    let a = Simulator::new(42).run(&table).unwrap();
    let b = Simulator::new(42).run(&table).unwrap();
    assert_eq!(a.len(), 200);
    // ビット単位で一致すること
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.peak_flow.to_bits(), y.peak_flow.to_bits());
        assert_eq!(x.vitals.spo2.to_bits(), y.vitals.spo2.to_bits());
    }
    assert_eq!(a, b);
}

#[test]
fn test_simulation_seed_changes_output() {
    let table = exposure_table(50);
    let a = Simulator::new(1).run(&table).unwrap();
    let b = Simulator::new(2).run(&table).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_simulation_passes_environment_through() {
    let table = exposure_table(30);
    let samples = Simulator::new(42).run(&table).unwrap();
    for (sample, row) in samples.iter().zip(table.rows.iter()) {
        assert_eq!(sample.aqi, row.aqi);
        assert_eq!(sample.humidity, row.humidity);
        assert_eq!(sample.temp_c, row.temp_c);
        assert_eq!(sample.features()[5], row.aqi);
    }
}

#[test]
fn test_lower_personal_best_lowers_labels() {
    let table = exposure_table(40);
    let normal = Simulator::new(7).run(&table).unwrap();
    let lower = Simulator::new(7)
        .with_personal_best(450.0)
        .run(&table)
        .unwrap();
    for (a, b) in normal.iter().zip(lower.iter()) {
        assert_le!(b.peak_flow, a.peak_flow);
    }
}

proptest! {
    #[test]
    fn test_simulated_values_within_physiologic_bounds(seed in 0u64..1000) {
        let table = exposure_table(64);
        let samples = Simulator::new(seed).run(&table).unwrap();
        for s in samples {
            prop_assert!(s.vitals.heart_rate >= HEART_RATE_RANGE.0 && s.vitals.heart_rate <= HEART_RATE_RANGE.1);
            prop_assert!(s.vitals.resp_rate >= RESP_RATE_RANGE.0 && s.vitals.resp_rate <= RESP_RATE_RANGE.1);
            prop_assert!(s.vitals.spo2 >= SPO2_RANGE.0 && s.vitals.spo2 <= SPO2_RANGE.1);
            prop_assert!(s.peak_flow >= PEAK_FLOW_RANGE.0 && s.peak_flow <= PEAK_FLOW_RANGE.1);
        }
    }
}
