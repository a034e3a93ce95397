// Pre-fitted model artifacts

pub mod predictor;
pub mod scaler;

pub use predictor::{LinearRegressor, ModelArtifact, PricePredictor, TrainedModel};
pub use scaler::{FeatureScaler, FittedScaler, MinMaxScaler, ScalerArtifact, StandardScaler};

use crate::core::{ArtifactError, FEATURE_COUNT, FEATURE_NAMES};

/// Convert an artifact column list into a fixed-size row.
fn columns(field: &'static str, values: Vec<f64>) -> Result<[f64; FEATURE_COUNT], ArtifactError> {
    let got = values.len();
    let row: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| ArtifactError::FeatureMismatch {
        field,
        expected: FEATURE_COUNT,
        got,
    })?;

    if row.iter().any(|v| !v.is_finite()) {
        return Err(ArtifactError::NonFinite(field));
    }
    Ok(row)
}

/// Artifacts may record the column order they were fitted on; if so it must match ours.
fn check_feature_names(names: Option<&[String]>) -> Result<(), ArtifactError> {
    match names {
        Some(names) if names.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied()) => {
            Err(ArtifactError::FeatureOrder(names.to_vec()))
        }
        _ => Ok(()),
    }
}
