use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::debug;
use serde_json::{Value, json};
use tokio::task;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::ServiceErr,
    schema::FeatureSchema,
    service::{self, BulkReport, PredictionResult},
    store::ModelStore,
};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ModelStore>,
}

/// Builds the service's routes on top of `store`.
///
/// Every route answers cross-origin requests from anywhere.
pub fn router(store: Arc<ModelStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/features", get(features))
        .route("/predict", post(predict))
        .route("/bulk_predict", post(bulk_predict))
        .layer(cors)
        .with_state(AppState { store })
}

/// A failed request.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Internal(String),
    Service(ServiceErr),
}

impl From<ServiceErr> for ApiError {
    fn from(value: ServiceErr) -> Self {
        Self::Service(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
            Self::Service(err) => {
                let status = match &err {
                    ServiceErr::Validation { .. } => StatusCode::BAD_REQUEST,
                    ServiceErr::NotReady => StatusCode::SERVICE_UNAVAILABLE,
                    ServiceErr::InvalidValue { .. }
                    | ServiceErr::Prediction(_)
                    | ServiceErr::Training(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };

                let body = match &err {
                    ServiceErr::Validation { missing } => json!({
                        "error": err.to_string(),
                        "missing_fields": missing,
                    }),
                    _ => json!({ "error": err.to_string() }),
                };

                (status, body)
            }
        };

        debug!(status = status.as_u16(); "request failed: {body}");
        (status, Json(body)).into_response()
    }
}

async fn home() -> Json<Value> {
    Json(json!({
        "message": "Crop Yield Prediction API",
        "status": "active",
        "endpoints": {
            "/predict": "POST - Make yield predictions",
            "/bulk_predict": "POST - Make several yield predictions at once",
            "/features": "GET - Get available feature options",
            "/health": "GET - Health check"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.store.is_ready(),
    }))
}

async fn features(State(state): State<AppState>) -> Result<Json<FeatureSchema>, ApiError> {
    match state.store.schema() {
        Ok(schema) => Ok(Json(schema.clone())),
        Err(_) => Err(ApiError::Internal(
            "Feature information not available".to_string(),
        )),
    }
}

async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let input = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(input)) if !input.is_empty() => input,
        _ => return Err(ApiError::BadRequest("No data provided")),
    };

    Ok(Json(service::predict_one(&state.store, &input)?))
}

async fn bulk_predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BulkReport>, ApiError> {
    let predictions = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(mut data)) => data.remove("predictions"),
        _ => None,
    };

    let items = match predictions {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ApiError::BadRequest("Predictions must be a list")),
        None => return Err(ApiError::BadRequest("No prediction data provided")),
    };

    let store = Arc::clone(&state.store);
    let report = task::spawn_blocking(move || service::predict_bulk(&store, &items))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(report))
}
