use machine_learning::preprocessing::{ColumnLayout, FeatureRow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ServiceErr;

pub const AREA: &str = "Area";
pub const CROP: &str = "Crop";
pub const SOIL_TYPE: &str = "Soil_Type";
pub const TEMPERATURE: &str = "Temperature";
pub const HUMIDITY: &str = "Humidity";
pub const PH: &str = "PH";
pub const ANNUAL_RAINFALL: &str = "Annual_Rainfall";

static NULL: Value = Value::Null;

pub const CATEGORICAL_FIELDS: [&str; 3] = [AREA, CROP, SOIL_TYPE];
pub const NUMERIC_FIELDS: [&str; 4] = [TEMPERATURE, HUMIDITY, PH, ANNUAL_RAINFALL];
pub const REQUIRED_FIELDS: [&str; 7] = [
    AREA,
    CROP,
    SOIL_TYPE,
    TEMPERATURE,
    HUMIDITY,
    PH,
    ANNUAL_RAINFALL,
];

/// The raw columns the model is trained on.
pub fn column_layout() -> ColumnLayout {
    ColumnLayout::new(CATEGORICAL_FIELDS, NUMERIC_FIELDS)
}

/// The seven input fields of a single crop observation.
#[derive(Debug, Clone, PartialEq)]
pub struct CropFeatures {
    pub area: String,
    pub crop: String,
    pub soil_type: String,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub annual_rainfall: f64,
}

impl CropFeatures {
    /// Reads the features out of a JSON object.
    ///
    /// Keys other than the required ones are ignored. Categorical fields must be strings,
    /// numeric fields may be numbers or strings holding a number.
    ///
    /// # Arguments
    /// * `input` - The JSON object of a prediction request.
    ///
    /// # Returns
    /// The typed features, a `Validation` error listing every missing field in canonical order,
    /// or an `InvalidValue` error for the first field holding a value of the wrong type.
    pub fn from_json(input: &Map<String, Value>) -> Result<Self, ServiceErr> {
        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|f| !input.contains_key(**f))
            .map(|f| f.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ServiceErr::Validation { missing });
        }

        Ok(Self {
            area: category(input, AREA)?,
            crop: category(input, CROP)?,
            soil_type: category(input, SOIL_TYPE)?,
            temperature: number(input, TEMPERATURE)?,
            humidity: number(input, HUMIDITY)?,
            ph: number(input, PH)?,
            annual_rainfall: number(input, ANNUAL_RAINFALL)?,
        })
    }

    /// Orders the values as the columns of `column_layout`.
    pub fn to_row(&self) -> FeatureRow {
        FeatureRow {
            categorical: vec![
                self.area.clone(),
                self.crop.clone(),
                self.soil_type.clone(),
            ],
            numeric: vec![
                self.temperature,
                self.humidity,
                self.ph,
                self.annual_rainfall,
            ],
        }
    }
}

fn category(input: &Map<String, Value>, field: &'static str) -> Result<String, ServiceErr> {
    match input.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(ServiceErr::InvalidValue {
            field,
            reason: format!("expected a string, got {}", other.unwrap_or(&NULL)),
        }),
    }
}

fn number(input: &Map<String, Value>, field: &'static str) -> Result<f64, ServiceErr> {
    let invalid = |reason: String| ServiceErr::InvalidValue { field, reason };

    let raw = input.get(field).unwrap_or(&NULL);

    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(invalid(format!("expected a finite number, got {v}"))),
        None => Err(invalid(format!("expected a number, got {raw}"))),
    }
}

/// A synthesized observation together with its yield.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    pub features: CropFeatures,
    pub crop_yield: f64,
}

/// The values every input field took in the training data.
///
/// Categories are sorted and deduplicated, numeric ranges are `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub areas: Vec<String>,
    pub crops: Vec<String>,
    pub soil_types: Vec<String>,
    pub temperature_range: [f64; 2],
    pub humidity_range: [f64; 2],
    pub ph_range: [f64; 2],
    pub rainfall_range: [f64; 2],
}

impl FeatureSchema {
    /// Records the categories and ranges present in `records`.
    ///
    /// # Returns
    /// The schema, or `None` if there are no records to describe.
    pub fn from_records(records: &[TrainingRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let features = || records.iter().map(|r| &r.features);

        Some(Self {
            areas: distinct(features().map(|f| f.area.as_str())),
            crops: distinct(features().map(|f| f.crop.as_str())),
            soil_types: distinct(features().map(|f| f.soil_type.as_str())),
            temperature_range: bounds(features().map(|f| f.temperature)),
            humidity_range: bounds(features().map(|f| f.humidity)),
            ph_range: bounds(features().map(|f| f.ph)),
            rainfall_range: bounds(features().map(|f| f.annual_rainfall)),
        })
    }

    /// An observation inside the schema: the first category of every field and the middle of
    /// every range.
    ///
    /// # Returns
    /// The observation, or `None` if some categorical field has no categories.
    pub fn representative(&self) -> Option<CropFeatures> {
        let middle = |[lo, hi]: [f64; 2]| lo + (hi - lo) / 2.0;

        Some(CropFeatures {
            area: self.areas.first()?.clone(),
            crop: self.crops.first()?.clone(),
            soil_type: self.soil_types.first()?.clone(),
            temperature: middle(self.temperature_range),
            humidity: middle(self.humidity_range),
            ph: middle(self.ph_range),
            annual_rainfall: middle(self.rainfall_range),
        })
    }
}

fn distinct<'a, I: Iterator<Item = &'a str>>(values: I) -> Vec<String> {
    let mut out: Vec<String> = values.map(str::to_owned).collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn bounds<I: Iterator<Item = f64>>(values: I) -> [f64; 2] {
    values.fold([f64::INFINITY, f64::NEG_INFINITY], |[lo, hi], v| {
        [lo.min(v), hi.max(v)]
    })
}
