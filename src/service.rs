use log::debug;
use machine_learning::MlErr;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    error::{Result, ServiceErr},
    schema::CropFeatures,
    store::{ModelStore, ReadyModel},
};

const SUCCESS: &str = "success";
const ERROR: &str = "error";

/// A single successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_yield: f64,
    pub input_data: Value,
    pub status: &'static str,
}

/// The outcome of one item of a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItem {
    pub id: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_yield: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub input_data: Value,
    pub status: &'static str,
}

impl BulkItem {
    pub fn is_success(&self) -> bool {
        self.predicted_yield.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkReport {
    pub results: Vec<BulkItem>,
    pub total_predictions: usize,
    pub successful_predictions: usize,
}

/// Rounds half away from zero to two decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Predicts the yield of a single observation.
///
/// # Arguments
/// * `store` - Holds the model to predict with.
/// * `input` - The observation, as sent by the client.
///
/// # Returns
/// The rounded prediction along with the input, or an error if the model isn't ready, the
/// input lacks fields or holds values of the wrong type.
pub fn predict_one(store: &ModelStore, input: &Map<String, Value>) -> Result<PredictionResult> {
    let model = store.model()?;
    let predicted_yield = predict_with(model, input)?;

    Ok(PredictionResult {
        predicted_yield,
        input_data: Value::Object(input.clone()),
        status: SUCCESS,
    })
}

/// Predicts the yield of many observations, each failing on its own.
///
/// Items are predicted in parallel, `results` keeps the request order and every item's `id` is
/// its position in the request.
///
/// # Returns
/// The per-item outcomes, or `NotReady` for the whole batch if there's no model yet.
pub fn predict_bulk(store: &ModelStore, items: &[Value]) -> Result<BulkReport> {
    let model = store.model()?;

    let results: Vec<BulkItem> = items
        .par_iter()
        .enumerate()
        .map(|(id, item)| bulk_item(model, id, item))
        .collect();

    let successful_predictions = results.iter().filter(|r| r.is_success()).count();
    debug!(total = results.len(), successful = successful_predictions; "bulk prediction");

    Ok(BulkReport {
        total_predictions: results.len(),
        successful_predictions,
        results,
    })
}

fn bulk_item(model: &ReadyModel, id: usize, item: &Value) -> BulkItem {
    let outcome = match item {
        Value::Object(input) => predict_with(model, input).map_err(|e| e.to_string()),
        _ => Err("Prediction data must be a JSON object".to_string()),
    };

    let (predicted_yield, error, status) = match outcome {
        Ok(y) => (Some(y), None, SUCCESS),
        Err(e) => (None, Some(e), ERROR),
    };

    BulkItem {
        id,
        predicted_yield,
        error,
        input_data: item.clone(),
        status,
    }
}

fn predict_with(model: &ReadyModel, input: &Map<String, Value>) -> Result<f64> {
    let features = CropFeatures::from_json(input)?;
    let y = model
        .pipeline
        .predict(&[features.to_row()])
        .map_err(ServiceErr::Prediction)?;

    if !y[0].is_finite() {
        return Err(ServiceErr::Prediction(MlErr::NonFinite {
            column: "prediction".into(),
        }));
    }

    Ok(round2(y[0]))
}
