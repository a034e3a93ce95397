pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::{ArtifactError, ErrorKind, PredictionError, PredictionResult};
pub use types::{
    FeatureVector, PredictionForm, PredictionRequest, PricePrediction, ScaledFeatureVector,
    FEATURE_COUNT, FEATURE_NAMES,
};
