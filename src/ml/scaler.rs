//! Pre-fitted feature scalers.
//!
//! A scaler artifact is a JSON document holding the per-column parameters
//! learned at training time:
//!
//! ```text
//! {"kind": "standard", "mean": [..], "scale": [..]}
//! {"kind": "min_max", "min": [..], "scale": [..]}
//! ```
//!
//! Both carry exactly one value per feature column and may also list
//! `feature_names` in fitted order.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{check_feature_names, columns};
use crate::core::{ArtifactError, FeatureVector, ScaledFeatureVector, FEATURE_COUNT};

/// Per-column transform applied before prediction.
pub trait FeatureScaler: Send + Sync {
    /// Transform a vector, keeping column count and order.
    fn scale(&self, vector: &FeatureVector) -> ScaledFeatureVector;

    /// Short name used in diagnostics.
    fn kind(&self) -> &'static str;
}

/// On-disk representation of a fitted scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feature_names: Option<Vec<String>>,
    },
    MinMax {
        min: Vec<f64>,
        scale: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feature_names: Option<Vec<String>>,
    },
}

/// Z-score standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    /// Zero scale (a constant training column) divides by one instead.
    pub fn new(mean: [f64; FEATURE_COUNT], scale: [f64; FEATURE_COUNT]) -> Self {
        let scale = scale.map(|s| if s == 0.0 { 1.0 } else { s });
        Self { mean, scale }
    }
}

impl FeatureScaler for StandardScaler {
    fn scale(&self, vector: &FeatureVector) -> ScaledFeatureVector {
        let x = vector.to_array();
        ScaledFeatureVector(std::array::from_fn(|i| (x[i] - self.mean[i]) / self.scale[i]))
    }

    fn kind(&self) -> &'static str {
        "standard"
    }
}

/// Min-max normalization in fitted form: `x * scale + min`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl MinMaxScaler {
    pub fn new(min: [f64; FEATURE_COUNT], scale: [f64; FEATURE_COUNT]) -> Self {
        Self { min, scale }
    }
}

impl FeatureScaler for MinMaxScaler {
    fn scale(&self, vector: &FeatureVector) -> ScaledFeatureVector {
        let x = vector.to_array();
        ScaledFeatureVector(std::array::from_fn(|i| x[i] * self.scale[i] + self.min[i]))
    }

    fn kind(&self) -> &'static str {
        "min_max"
    }
}

/// Scaler loaded from an artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum FittedScaler {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl FittedScaler {
    pub fn load_from_file(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ArtifactError> {
        let artifact: ScalerArtifact = serde_json::from_str(content)?;
        Self::try_from(artifact)
    }
}

impl TryFrom<ScalerArtifact> for FittedScaler {
    type Error = ArtifactError;

    fn try_from(artifact: ScalerArtifact) -> Result<Self, Self::Error> {
        match artifact {
            ScalerArtifact::Standard {
                mean,
                scale,
                feature_names,
            } => {
                check_feature_names(feature_names.as_deref())?;
                Ok(FittedScaler::Standard(StandardScaler::new(
                    columns("mean", mean)?,
                    columns("scale", scale)?,
                )))
            }
            ScalerArtifact::MinMax {
                min,
                scale,
                feature_names,
            } => {
                check_feature_names(feature_names.as_deref())?;
                Ok(FittedScaler::MinMax(MinMaxScaler::new(
                    columns("min", min)?,
                    columns("scale", scale)?,
                )))
            }
        }
    }
}

impl FeatureScaler for FittedScaler {
    fn scale(&self, vector: &FeatureVector) -> ScaledFeatureVector {
        match self {
            FittedScaler::Standard(scaler) => scaler.scale(vector),
            FittedScaler::MinMax(scaler) => scaler.scale(vector),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FittedScaler::Standard(scaler) => scaler.kind(),
            FittedScaler::MinMax(scaler) => scaler.kind(),
        }
    }
}
