use super::*;
use crate::fixtures::{self, FailingHistory};
use peakflow::zone::Zone;
use serde_json::json;

#[tokio::test]
async fn test_assess_green_and_records_history() -> Result<()> {
    let (service, store) = fixtures::memory_service();

    let assessment = service.assess(&fixtures::request(120.0, 600.0)).await.unwrap();
    assert_eq!(assessment.risk.zone, Zone::Green);
    assert_eq!(assessment.risk.predicted_peak_flow, 480.0);
    assert_eq!(assessment.risk.peak_flow_percent, 80.0);
    assert_eq!(assessment.persisted, Persisted::Saved);

    let saved = store.recent(10).await?;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].zone, "green");
    assert_eq!(saved[0].predicted_peak_flow, 480.0);
    assert_eq!(saved[0].peak_flow_percent, 80.0);
    Ok(())
}

#[tokio::test]
async fn test_assess_yellow_and_red() {
    let (service, _store) = fixtures::memory_service();

    let yellow = service.assess(&fixtures::request(300.0, 600.0)).await.unwrap();
    assert_eq!(yellow.risk.zone, Zone::Yellow);
    assert_eq!(yellow.risk.peak_flow_percent, 50.0);

    let red = service.assess(&fixtures::request(400.0, 600.0)).await.unwrap();
    assert_eq!(red.risk.zone, Zone::Red);
    assert_eq!(red.risk.peak_flow_percent, 33.3);
}

#[tokio::test]
async fn test_zero_baseline_is_rejected_and_not_recorded() -> Result<()> {
    let (service, store) = fixtures::memory_service();

    let err = service
        .assess(&fixtures::request(120.0, 0.0))
        .await
        .unwrap_err();
    assert_eq!(err, RequestError::InvalidBaseline(0.0));
    assert!(store.recent(10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_fields_include_personal_best() -> Result<()> {
    let (service, store) = fixtures::memory_service();

    let mut body = fixtures::request(120.0, 600.0);
    let map = body.as_object_mut().unwrap();
    map.remove("spo2");
    map.remove(PERSONAL_BEST_FIELD);

    let err = service.assess(&body).await.unwrap_err();
    assert_eq!(
        err,
        RequestError::MissingFields(vec!["spo2".to_string(), "personalBestPeakFlow".to_string()])
    );
    assert!(store.recent(10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_only_spo2_missing() {
    let (service, _store) = fixtures::memory_service();

    let mut body = fixtures::request(120.0, 600.0);
    body.as_object_mut().unwrap().remove("spo2");

    assert_eq!(
        service.assess(&body).await.unwrap_err(),
        RequestError::MissingFields(vec!["spo2".to_string()])
    );
}

#[tokio::test]
async fn test_non_numeric_baseline_is_rejected() {
    let (service, _store) = fixtures::memory_service();

    let mut body = fixtures::request(120.0, 600.0);
    body[PERSONAL_BEST_FIELD] = json!("lots");
    assert!(matches!(
        service.assess(&body).await.unwrap_err(),
        RequestError::InvalidInputType { .. }
    ));
}

#[tokio::test]
async fn test_non_object_body_is_rejected() {
    let (service, _store) = fixtures::memory_service();
    assert_eq!(
        service.assess(&json!([1, 2, 3])).await.unwrap_err(),
        RequestError::NotAnObject
    );
}

#[tokio::test]
async fn test_save_failure_becomes_warning() {
    let service = PeakFlowService::new(fixtures::engine(), Arc::new(FailingHistory));

    let assessment = service.assess(&fixtures::request(120.0, 600.0)).await.unwrap();
    assert_eq!(assessment.risk.zone, Zone::Green);
    assert_eq!(
        assessment.persisted,
        Persisted::Warning("Prediction save failed: connection refused".to_string())
    );

    let response = assessment.to_response();
    assert_eq!(
        response.warning.as_deref(),
        Some("Prediction save failed: connection refused")
    );
    assert_eq!(response.message, "You can breathe easy!");
}

#[tokio::test]
async fn test_recent_is_newest_first_and_clamped() -> Result<()> {
    let (service, _store) = fixtures::memory_service();
    for aqi in [100.0, 200.0, 300.0] {
        service.assess(&fixtures::request(aqi, 600.0)).await.unwrap();
    }

    let entries = service.recent(None).await?;
    let preds: Vec<f64> = entries.iter().map(|e| e.predicted_peak_flow).collect();
    assert_eq!(preds, vec![300.0, 400.0, 500.0]);

    assert_eq!(service.recent(Some(0)).await?.len(), 1);
    assert_eq!(service.recent(Some(2)).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_recent_propagates_read_failure() {
    let service = PeakFlowService::new(fixtures::engine(), Arc::new(FailingHistory));
    assert!(service.recent(None).await.is_err());
}

#[test]
fn test_required_fields_order() {
    let (service, _store) = fixtures::memory_service();
    assert_eq!(
        service.required_fields(),
        vec![
            "heartRate",
            "respRate",
            "spo2",
            "tempC",
            "humidity",
            "aqi",
            "personalBestPeakFlow"
        ]
    );
}

#[tokio::test]
async fn test_non_finite_prediction_is_rejected_and_not_recorded() -> Result<()> {
    let store = Arc::new(persistence::history::MemoryHistory::new());
    let engine = InferenceEngine::new(Arc::new(fixtures::bundle_with(vec![
        1.0, 1.0, 0.0, 0.0, 0.0, 0.0,
    ])));
    let service = PeakFlowService::new(engine, store.clone());

    let mut body = fixtures::request(120.0, 600.0);
    body["heartRate"] = json!(1e308);
    body["respRate"] = json!(1e308);

    let err = service.assess(&body).await.unwrap_err();
    assert!(matches!(err, RequestError::NonFinitePrediction(_)));
    assert!(store.recent(10).await?.is_empty());
    Ok(())
}
