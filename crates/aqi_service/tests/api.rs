//! HTTP API tests driving the router in-process

use std::collections::BTreeMap;
use std::sync::Arc;

use aqi_core::bundle::TrainingSummary;
use aqi_core::{ArtifactBundle, CityEncoder, ForestModel, HistoricalData, ModelMetrics, Node, Tree};
use aqi_service::{build_router, AppState, LiveAqiSource, LiveFetchError, ServiceConfig};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

const DATASET: &str = "\
City,Date,PM2.5,PM10,NO2,AQI,AQI_Bucket
Delhi,2020-01-01,180.2,300.1,60.0,320,Very Poor
Delhi,2020-01-02,140.0,250.0,55.2,260,Poor
Delhi,2020-01-03,95.0,170.3,,150,Moderate
Mumbai,2020-01-02,40.0,70.0,20.1,80,Satisfactory
Chennai,2020-01-03,20.0,40.0,10.0,45,Good
Agra,2020-01-03,60.0,90.0,30.0,110,Moderate
";

/// Live source that only knows Delhi
struct StubLive;

#[async_trait]
impl LiveAqiSource for StubLive {
    async fn fetch_live_aqi(&self, city: &str) -> Result<f64, LiveFetchError> {
        match city {
            "Delhi" => Ok(350.0),
            _ => Err(LiveFetchError::Timeout),
        }
    }
}

fn bundle() -> ArtifactBundle {
    let by_pollution = Tree::new(vec![
        Node::internal(0, 1, 100.0, 1, 2),
        Node::leaf(1, 70.4),
        Node::internal(2, 2, 200.0, 3, 4),
        Node::leaf(3, 150.6),
        Node::leaf(4, 290.2),
    ]);
    let by_city = Tree::new(vec![
        Node::internal(0, 0, 0.5, 1, 2),
        Node::leaf(1, 60.0),
        Node::leaf(2, 180.0),
    ]);
    ArtifactBundle::new(
        ["City", "PM2.5", "PM10", "NO2"].map(String::from).to_vec(),
        CityEncoder::fit(["Chennai", "Delhi", "Mumbai"]),
        ForestModel::new(4, vec![by_pollution, by_city], vec![0.2, 0.5, 0.3, 0.0]),
        ModelMetrics {
            rmse: 24.37,
            r2: 0.912,
        },
        BTreeMap::from([
            ("NO2".to_string(), 19.05),
            ("PM10".to_string(), 120.15),
            ("PM2.5".to_string(), 67.5),
        ]),
        TrainingSummary::default(),
    )
}

fn app() -> Router {
    let data = HistoricalData::from_reader(DATASET.as_bytes()).unwrap();
    let bundle = bundle();
    let checksum = bundle.checksum().unwrap();
    let state = AppState::new(
        ServiceConfig::default(),
        bundle,
        checksum,
        data,
        Arc::new(StubLive),
    )
    .unwrap();
    build_router(Arc::new(state))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(app(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["trees"], 2);
    assert_eq!(body["dataset_rows"], 6);
    assert_eq!(body["model_checksum"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_cities_excludes_unknown_to_model() {
    let (status, body) = get(app(), "/api/cities").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cities"], serde_json::json!(["Chennai", "Delhi", "Mumbai"]));
}

#[tokio::test]
async fn test_legend_order() {
    let (_, body) = get(app(), "/api/legend").await;
    let labels: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["label"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        ["Good", "Moderate", "Unhealthy", "Very Unhealthy", "Hazardous"]
    );
}

#[tokio::test]
async fn test_predict_with_live_reading() {
    let (status, body) = get(app(), "/api/predict?city=Delhi").await;
    assert_eq!(status, StatusCode::OK);

    // (70.4 + 180.0) / 2 = 125.2
    assert_eq!(body["predicted_aqi"], 125);
    assert_eq!(body["predicted_category"]["label"], "Unhealthy");
    assert_eq!(body["live_aqi"], 350);
    assert_eq!(body["live_category"]["label"], "Hazardous");
    assert_eq!(body["difference"], 225);
    assert_eq!(body["advisory_tier"]["label"], "Hazardous");
    assert_eq!(body["trend"].as_array().unwrap().len(), 3);
    assert_eq!(body["trend"][0]["date"], "2020-01-01");
}

#[tokio::test]
async fn test_predict_without_live_reading() {
    let (status, body) = get(app(), "/api/predict?city=Chennai").await;
    assert_eq!(status, StatusCode::OK);

    // (70.4 + 60.0) / 2 = 65.2
    assert_eq!(body["predicted_aqi"], 65);
    assert!(body["live_aqi"].is_null());
    assert!(body["difference"].is_null());
    assert_eq!(body["advisory_tier"]["label"], "Moderate");
    assert!(!body["advisory_text"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_predict_error_statuses() {
    let (status, body) = get(app(), "/api/predict?city=Pune").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Pune"));

    let (status, _) = get(app(), "/api/predict?city=Agra").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(), "/api/predict").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(), "/api/predict?city=%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analytics() {
    let (status, body) = get(app(), "/api/analytics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feature_importance"][0]["feature"], "PM2.5");
    assert_eq!(body["city_average"].as_array().unwrap().len(), 4);
    assert!(body["stage_comparison"].as_array().unwrap().len() >= 2);
    assert!(!body["histogram"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_page() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Smart AQI Dashboard"));
    assert!(html.contains("/api/predict"));
    for id in ["trend", "stages", "correlation", "histogram"] {
        assert!(html.contains(&format!("id=\"{id}\"")), "missing #{id}");
    }
    assert!(html.contains("toFixed(3)"));
    assert!(!html.contains("innerHTML"));
}

#[tokio::test]
async fn test_state_load_fails_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        artifact_dir: dir.path().join("missing"),
        ..ServiceConfig::default()
    };
    assert!(AppState::load(config).is_err());
}

#[tokio::test]
async fn test_state_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    bundle().save(dir.path()).unwrap();
    let dataset = dir.path().join("air_quality_data.csv");
    std::fs::write(&dataset, DATASET).unwrap();

    let config = ServiceConfig {
        artifact_dir: dir.path().to_path_buf(),
        dataset_path: dataset,
        ..ServiceConfig::default()
    };
    let state = AppState::load(config).unwrap();
    assert_eq!(state.selectable_cities(), vec!["Chennai", "Delhi", "Mumbai"]);
    assert_eq!(state.checksum.len(), 64);
}

#[test]
fn test_state_rejects_dataset_without_feature_column() {
    let without_no2 = "\
City,Date,PM2.5,PM10,AQI
Delhi,2020-01-03,95.0,170.3,150
";
    let data = HistoricalData::from_reader(without_no2.as_bytes()).unwrap();
    let bundle = bundle();
    let checksum = bundle.checksum().unwrap();
    let result = AppState::new(
        ServiceConfig::default(),
        bundle,
        checksum,
        data,
        Arc::new(StubLive),
    );
    match result {
        Err(err) => assert!(err.to_string().contains("NO2")),
        Ok(_) => panic!("state built over a dataset without NO2"),
    }
}

#[tokio::test]
async fn test_state_load_fails_on_column_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    bundle().save(dir.path()).unwrap();
    let dataset = dir.path().join("air_quality_data.csv");
    std::fs::write(&dataset, "City,Date,PM2.5,AQI\nDelhi,2020-01-03,95.0,150\n").unwrap();

    let config = ServiceConfig {
        artifact_dir: dir.path().to_path_buf(),
        dataset_path: dataset,
        ..ServiceConfig::default()
    };
    assert!(AppState::load(config).is_err());
}
