use std::{
    fs,
    sync::{Arc, OnceLock},
};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use crop_yield_service::{ModelStore, http::router, synth::SynthConfig};
use http_body_util::BodyExt;
use machine_learning::training::TrainerConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

fn new_store(name: &str) -> ModelStore {
    let path = std::env::temp_dir().join(format!(
        "crop-yield-http-{}-{name}.json",
        std::process::id()
    ));
    let _ = fs::remove_file(&path);

    let synth = SynthConfig {
        seed: 42,
        samples: 300,
    };
    let trainer = TrainerConfig {
        n_trees: 5,
        ..TrainerConfig::default()
    };
    ModelStore::new(path, synth, trainer)
}

fn ready_store() -> Arc<ModelStore> {
    static STORE: OnceLock<Arc<ModelStore>> = OnceLock::new();
    STORE
        .get_or_init(|| {
            let store = new_store("ready");
            store.ensure_ready().unwrap();
            let _ = fs::remove_file(store.path());
            Arc::new(store)
        })
        .clone()
}

fn app() -> Router {
    router(ready_store())
}

fn punjab_wheat() -> Value {
    json!({
        "Area": "Punjab",
        "Crop": "Wheat",
        "Soil_Type": "Loamy",
        "Temperature": 25.0,
        "Humidity": 65.0,
        "PH": 6.5,
        "Annual_Rainfall": 800.0
    })
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn post(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn is_rounded(x: f64) -> bool {
    ((x * 100.0).round() - x * 100.0).abs() < 1e-6
}

#[tokio::test]
async fn home_lists_the_endpoints() {
    let (status, body) = get(app(), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Crop Yield Prediction API");
    assert_eq!(body["status"], "active");
    for endpoint in ["/predict", "/bulk_predict", "/features", "/health"] {
        assert!(body["endpoints"].get(endpoint).is_some());
    }
}

#[tokio::test]
async fn health_reports_readiness() {
    let store = Arc::new(new_store("health"));

    let (status, body) = get(router(Arc::clone(&store)), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy", "model_loaded": false }));

    store.ensure_ready().unwrap();
    let (_, body) = get(router(Arc::clone(&store)), "/health").await;
    assert_eq!(body["model_loaded"], true);

    let _ = fs::remove_file(store.path());
}

#[tokio::test]
async fn not_ready_service_refuses_work() {
    let store = Arc::new(new_store("not-ready"));

    let (status, body) = get(router(Arc::clone(&store)), "/features").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Feature information not available");

    let (status, _) = post(router(Arc::clone(&store)), "/predict", punjab_wheat().to_string()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let bulk = json!({ "predictions": [punjab_wheat()] });
    let (status, _) = post(router(store), "/bulk_predict", bulk.to_string()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn features_describe_the_training_data() {
    let (status, body) = get(app(), "/features").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["soil_types"],
        json!(["Alluvial", "Black", "Clay", "Loamy", "Red", "Sandy"])
    );
    assert_eq!(body["areas"].as_array().unwrap().len(), 10);
    assert_eq!(body["crops"].as_array().unwrap().len(), 10);

    for range in ["temperature_range", "humidity_range", "ph_range", "rainfall_range"] {
        let bounds = body[range].as_array().unwrap();
        assert_eq!(bounds.len(), 2);
        assert!(bounds[0].as_f64().unwrap() <= bounds[1].as_f64().unwrap());
    }
}

#[tokio::test]
async fn predicts_a_single_observation() {
    let (status, body) = post(app(), "/predict", punjab_wheat().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["input_data"], punjab_wheat());

    let predicted = body["predicted_yield"].as_f64().unwrap();
    assert!(is_rounded(predicted));
    assert!(predicted > 0.0);
}

#[tokio::test]
async fn unknown_area_still_predicts() {
    let mut input = punjab_wheat();
    input["Area"] = json!("Atlantis");

    let (status, body) = post(app(), "/predict", input.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted_yield"].is_number());
}

#[tokio::test]
async fn missing_fields_are_a_bad_request() {
    let mut input = punjab_wheat();
    let fields = input.as_object_mut().unwrap();
    fields.remove("PH");
    fields.remove("Area");

    let (status, body) = post(app(), "/predict", input.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["missing_fields"], json!(["Area", "PH"]));
    assert!(body["error"].as_str().unwrap().contains("Missing required fields"));
}

#[tokio::test]
async fn empty_predict_bodies_are_rejected() {
    for body in ["", "{}", "not json", "[1, 2]"] {
        let (status, response) = post(app(), "/predict", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(response["error"], "No data provided");
    }
}

#[tokio::test]
async fn wrongly_typed_values_fail_the_prediction() {
    let mut input = punjab_wheat();
    input["Temperature"] = json!("very hot");

    let (status, body) = post(app(), "/predict", input.to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Temperature"));
}

#[tokio::test]
async fn bulk_predicts_every_item() {
    let bulk = json!({
        "predictions": [punjab_wheat(), { "Area": "Punjab" }, punjab_wheat()]
    });

    let (status, body) = post(app(), "/bulk_predict", bulk.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_predictions"], 3);
    assert_eq!(body["successful_predictions"], 2);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["id"], 0);
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[1]["id"], 1);
    assert_eq!(results[1]["status"], "error");
    assert_eq!(results[1]["input_data"], json!({ "Area": "Punjab" }));
    assert!(results[1]["error"].is_string());
    assert_eq!(results[2]["predicted_yield"], results[0]["predicted_yield"]);
}

#[tokio::test]
async fn empty_bulk_is_fine() {
    let (status, body) = post(app(), "/bulk_predict", r#"{"predictions": []}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "results": [], "total_predictions": 0, "successful_predictions": 0 })
    );
}

#[tokio::test]
async fn malformed_bulk_requests_are_rejected() {
    for body in ["", "{}", r#"{"items": []}"#, "[]"] {
        let (status, response) = post(app(), "/bulk_predict", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(response["error"], "No prediction data provided");
    }

    let (status, response) = post(app(), "/bulk_predict", r#"{"predictions": {"a": 1}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Predictions must be a list");
}

#[tokio::test]
async fn answers_cross_origin_requests() {
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
