use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{check_feature_names, columns};
use crate::core::{ArtifactError, ScaledFeatureVector, FEATURE_COUNT};

/// Trait for price prediction models
pub trait PricePredictor: Send + Sync {
    /// Predict the natural log of the price from a scaled vector.
    fn predict_log_price(&self, features: &ScaledFeatureVector) -> f64;

    fn kind(&self) -> &'static str;
}

/// On-disk representation of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feature_names: Option<Vec<String>>,
    },
}

/// Linear regression on the log price.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressor {
    coefficients: [f64; FEATURE_COUNT],
    intercept: f64,
}

impl LinearRegressor {
    pub fn new(coefficients: [f64; FEATURE_COUNT], intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }
}

impl PricePredictor for LinearRegressor {
    fn predict_log_price(&self, features: &ScaledFeatureVector) -> f64 {
        self.coefficients
            .iter()
            .zip(features.values())
            .fold(self.intercept, |acc, (w, x)| acc + w * x)
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

/// Model loaded from an artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainedModel {
    Linear(LinearRegressor),
}

impl TrainedModel {
    pub fn load_from_file(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ArtifactError> {
        let artifact: ModelArtifact = serde_json::from_str(content)?;
        Self::try_from(artifact)
    }
}

impl TryFrom<ModelArtifact> for TrainedModel {
    type Error = ArtifactError;

    fn try_from(artifact: ModelArtifact) -> Result<Self, Self::Error> {
        match artifact {
            ModelArtifact::Linear {
                coefficients,
                intercept,
                feature_names,
            } => {
                check_feature_names(feature_names.as_deref())?;
                if !intercept.is_finite() {
                    return Err(ArtifactError::NonFinite("intercept"));
                }
                Ok(TrainedModel::Linear(LinearRegressor::new(
                    columns("coefficients", coefficients)?,
                    intercept,
                )))
            }
        }
    }
}

impl PricePredictor for TrainedModel {
    fn predict_log_price(&self, features: &ScaledFeatureVector) -> f64 {
        match self {
            TrainedModel::Linear(model) => model.predict_log_price(features),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TrainedModel::Linear(model) => model.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_prediction() {
        let model = LinearRegressor::new([0.02, 0.45, -0.05, 0.1, 0.35], 13.0);
        let scaled = ScaledFeatureVector([
            0.0,
            0.25641025641025644,
            0.3939393939393939,
            -0.52,
            -0.18207282913165265,
        ]);

        let log_price = model.predict_log_price(&scaled);
        assert!((log_price - 12.979962155491567).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_is_pure() {
        let model = LinearRegressor::new([1.0, 2.0, 3.0, 4.0, 5.0], 0.5);
        let scaled = ScaledFeatureVector([1.0; 5]);

        assert_eq!(model.predict_log_price(&scaled), 15.5);
        assert_eq!(model.predict_log_price(&scaled), model.predict_log_price(&scaled));
    }

    #[test]
    fn test_from_json() {
        let model = TrainedModel::from_json(
            r#"{"kind": "linear", "coefficients": [0, 0, 0, 0, 1], "intercept": 2.0}"#,
        )
        .unwrap();

        assert_eq!(model.kind(), "linear");
        assert_eq!(model.predict_log_price(&ScaledFeatureVector([0.0, 0.0, 0.0, 0.0, 3.0])), 5.0);
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let err = TrainedModel::from_json(
            r#"{"kind": "linear", "coefficients": [1, 2, 3, 4, 5, 6], "intercept": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::FeatureMismatch { field: "coefficients", got: 6, .. }
        ));
    }

    #[test]
    fn test_missing_intercept_rejected() {
        let err = TrainedModel::from_json(r#"{"kind": "linear", "coefficients": [1, 2, 3, 4, 5]}"#)
            .unwrap_err();
        assert!(matches!(err, ArtifactError::ParseError(_)));
    }
}
