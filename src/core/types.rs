use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of model input columns.
pub const FEATURE_COUNT: usize = 5;

/// Column order the scaler and model were fitted on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["brand", "year", "transmission", "engine", "max_power"];

/// Raw form submission as it arrives from the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionForm {
    pub brand: Option<String>,
    pub year: Option<String>,
    pub transmission: Option<String>,
    pub engine: Option<String>,
    pub max_power: Option<String>,
}

/// The five trimmed field values of one submission.
///
/// Numeric fields stay as submitted text until assembly parses them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub brand: String,
    pub year: String,
    pub transmission: String,
    pub engine: String,
    pub max_power: String,
}

impl PredictionRequest {
    pub fn new(
        brand: impl Into<String>,
        year: impl Into<String>,
        transmission: impl Into<String>,
        engine: impl Into<String>,
        max_power: impl Into<String>,
    ) -> Self {
        Self {
            brand: brand.into(),
            year: year.into(),
            transmission: transmission.into(),
            engine: engine.into(),
            max_power: max_power.into(),
        }
    }
}

/// Encoded model inputs for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub brand_code: u32,
    pub year: i64,
    pub transmission_code: u32,
    pub engine: f64,
    pub max_power: f64,
}

impl FeatureVector {
    /// Values in fitted column order: brand, year, transmission, engine, max_power.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.brand_code),
            self.year as f64,
            f64::from(self.transmission_code),
            self.engine,
            self.max_power,
        ]
    }
}

/// Feature vector after the scaler transform. Same arity and order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaledFeatureVector(pub [f64; FEATURE_COUNT]);

impl ScaledFeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

/// Successful prediction with the inputs echoed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePrediction {
    pub request_id: Uuid,
    pub brand: String,
    pub year: i64,
    pub transmission: String,
    pub engine: f64,
    pub max_power: f64,
    pub predicted_price: f64,
}

/// Rounds to two decimal places using the exact binary value.
///
/// `2.675` is stored just below the tie and rounds to `2.67`. Exact ties
/// round to even. Non-finite and very large values come back unchanged.
pub fn round_to_cents(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= 1e15 {
        return value;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}
