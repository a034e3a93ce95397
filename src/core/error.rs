use serde::Serialize;
use thiserror::Error;

/// Coarse classification of prediction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownBrand,
    UnknownTransmission,
    MalformedInput,
    InternalFailure,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Brand '{0}' is not recognized.")]
    UnknownBrand(String),

    #[error("Transmission type '{0}' is not recognized.")]
    UnknownTransmission(String),

    #[error("Field '{0}' is required.")]
    MissingField(&'static str),

    #[error("Field '{field}' has malformed value '{value}'.")]
    MalformedInput { field: &'static str, value: String },

    #[error("Internal failure: {0}")]
    InternalFailure(String),
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::UnknownBrand(_) => ErrorKind::UnknownBrand,
            PredictionError::UnknownTransmission(_) => ErrorKind::UnknownTransmission,
            PredictionError::MissingField(_) | PredictionError::MalformedInput { .. } => {
                ErrorKind::MalformedInput
            }
            PredictionError::InternalFailure(_) => ErrorKind::InternalFailure,
        }
    }

    /// True when the failure was caused by what the user submitted.
    pub fn is_user_error(&self) -> bool {
        self.kind() != ErrorKind::InternalFailure
    }
}

/// Errors raised while loading the scaler or model artifacts.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Artifact parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Feature mismatch in {field}: expected {expected} columns, got {got}")]
    FeatureMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Feature names {0:?} do not match the expected column order")]
    FeatureOrder(Vec<String>),

    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),
}

pub type PredictionResult<T> = Result<T, PredictionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PredictionError::UnknownBrand("Tesla".to_string());
        assert_eq!(err.to_string(), "Brand 'Tesla' is not recognized.");

        let err = PredictionError::MalformedInput {
            field: "year",
            value: "not_a_number".to_string(),
        };
        assert!(err.to_string().contains("year"));
        assert!(err.to_string().contains("not_a_number"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(PredictionError::MissingField("engine").kind(), ErrorKind::MalformedInput);
        assert_eq!(
            PredictionError::UnknownTransmission("CVT".to_string()).kind(),
            ErrorKind::UnknownTransmission
        );
        assert!(!PredictionError::InternalFailure("boom".to_string()).is_user_error());
        assert!(PredictionError::UnknownBrand("x".to_string()).is_user_error());
    }

    #[test]
    fn test_artifact_error_from_json() {
        let err: ArtifactError = serde_json::from_str::<Vec<f64>>("{").unwrap_err().into();
        assert!(matches!(err, ArtifactError::ParseError(_)));
    }
}
