//! Request handling for price predictions.
//!
//! A submission moves through
//! `Received → Validating → Assembling → Scaling → Predicting → Formatting`
//! and ends in `Succeeded` or `Failed`. The first failing stage ends the
//! request; nothing is retried. Panics raised by the scaler or model are
//! caught here and reported as [`PredictionError::InternalFailure`].

use anyhow::{Context, Result};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::core::config::ArtifactConfig;
use crate::core::types::round_to_cents;
use crate::core::{PredictionError, PredictionForm, PredictionRequest, PredictionResult, PricePrediction};
use crate::encoding::{EncodingError, EncodingTable};
use crate::features::assemble;
use crate::ml::{FeatureScaler, FittedScaler, PricePredictor, TrainedModel};
use crate::track_performance;

/// Read-only state shared by every request.
pub struct PredictionContext {
    brands: EncodingTable,
    transmissions: EncodingTable,
    scaler: Arc<dyn FeatureScaler>,
    predictor: Arc<dyn PricePredictor>,
}

impl PredictionContext {
    /// Context with the built-in encoding tables.
    pub fn new(
        scaler: Arc<dyn FeatureScaler>,
        predictor: Arc<dyn PricePredictor>,
    ) -> Result<Self, EncodingError> {
        Ok(Self::with_tables(
            EncodingTable::brands()?,
            EncodingTable::transmissions()?,
            scaler,
            predictor,
        ))
    }

    pub fn with_tables(
        brands: EncodingTable,
        transmissions: EncodingTable,
        scaler: Arc<dyn FeatureScaler>,
        predictor: Arc<dyn PricePredictor>,
    ) -> Self {
        Self {
            brands,
            transmissions,
            scaler,
            predictor,
        }
    }

    /// Load the scaler and model artifacts named in the settings.
    pub fn load(artifacts: &ArtifactConfig) -> Result<Self> {
        let scaler = FittedScaler::load_from_file(&artifacts.scaler_path).with_context(|| {
            format!("Failed to load scaler from {}", artifacts.scaler_path.display())
        })?;
        let model = TrainedModel::load_from_file(&artifacts.model_path).with_context(|| {
            format!("Failed to load model from {}", artifacts.model_path.display())
        })?;

        info!(
            scaler = scaler.kind(),
            model = model.kind(),
            "Prediction artifacts loaded"
        );

        Self::new(Arc::new(scaler), Arc::new(model)).context("Failed to build encoding tables")
    }

    pub fn brands(&self) -> &EncodingTable {
        &self.brands
    }

    pub fn transmissions(&self) -> &EncodingTable {
        &self.transmissions
    }
}

/// Pipeline stages of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validating,
    Assembling,
    Scaling,
    Predicting,
    Formatting,
    Succeeded,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validating => "validating",
            Stage::Assembling => "assembling",
            Stage::Scaling => "scaling",
            Stage::Predicting => "predicting",
            Stage::Formatting => "formatting",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct RequestHandler {
    context: Arc<PredictionContext>,
}

impl RequestHandler {
    pub fn new(context: Arc<PredictionContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &PredictionContext {
        &self.context
    }

    /// Handle one submission under a fresh request id.
    pub fn handle(&self, form: &PredictionForm) -> PredictionResult<PricePrediction> {
        self.handle_with_id(Uuid::new_v4(), form)
    }

    pub fn handle_with_id(
        &self,
        request_id: Uuid,
        form: &PredictionForm,
    ) -> PredictionResult<PricePrediction> {
        let span = info_span!("predict", request_id = %request_id);
        let _enter = span.enter();
        track_performance!("predict");

        let mut stage = Stage::Received;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(request_id, form, &mut stage)
        }));

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(PredictionError::InternalFailure(panic_message(&*payload))),
        };

        match &result {
            Ok(prediction) => {
                advance(&mut stage, Stage::Succeeded);
                info!(predicted_price = prediction.predicted_price, "Prediction succeeded");
            }
            Err(error) => {
                warn!(
                    failed_stage = %stage,
                    kind = ?error.kind(),
                    error = %error,
                    "Prediction failed"
                );
                advance(&mut stage, Stage::Failed);
            }
        }

        result
    }

    fn run(
        &self,
        request_id: Uuid,
        form: &PredictionForm,
        stage: &mut Stage,
    ) -> PredictionResult<PricePrediction> {
        advance(stage, Stage::Validating);
        let request = validate(form)?;
        info!(
            brand = %request.brand,
            year = %request.year,
            transmission = %request.transmission,
            engine = %request.engine,
            max_power = %request.max_power,
            "Inputs received"
        );

        advance(stage, Stage::Assembling);
        let features = assemble(&request, &self.context.brands, &self.context.transmissions)?;
        debug!(features = ?features.to_array(), "Features before scaling");

        advance(stage, Stage::Scaling);
        let scaled = self.context.scaler.scale(&features);
        debug!(
            scaler = self.context.scaler.kind(),
            features = ?scaled.values(),
            "Features after scaling"
        );

        advance(stage, Stage::Predicting);
        let log_price = self.context.predictor.predict_log_price(&scaled);
        debug!(model = self.context.predictor.kind(), log_price, "Predicted log price");
        if !log_price.is_finite() {
            return Err(PredictionError::InternalFailure(format!(
                "model returned a non-finite log price ({})",
                log_price
            )));
        }

        advance(stage, Stage::Formatting);
        let price = round_to_cents(log_price.exp());
        debug!(price, "Predicted price");
        if !price.is_finite() {
            return Err(PredictionError::InternalFailure(format!(
                "log price {} is out of range",
                log_price
            )));
        }

        Ok(PricePrediction {
            request_id,
            brand: request.brand,
            year: features.year,
            transmission: request.transmission,
            engine: features.engine,
            max_power: features.max_power,
            predicted_price: price,
        })
    }
}

/// Extract the five fields, trimmed. Blank counts as missing.
pub fn validate(form: &PredictionForm) -> PredictionResult<PredictionRequest> {
    Ok(PredictionRequest {
        brand: required("brand", &form.brand)?,
        year: required("year", &form.year)?,
        transmission: required("transmission", &form.transmission)?,
        engine: required("engine", &form.engine)?,
        max_power: required("max_power", &form.max_power)?,
    })
}

fn required(field: &'static str, value: &Option<String>) -> PredictionResult<String> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(PredictionError::MissingField(field)),
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "Stage transition");
    *stage = next;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected panic in prediction pipeline".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FeatureVector, ScaledFeatureVector};
    use crate::ml::{LinearRegressor, StandardScaler};
    use pretty_assertions::assert_eq;

    struct PanickingScaler;

    impl FeatureScaler for PanickingScaler {
        fn scale(&self, _vector: &FeatureVector) -> ScaledFeatureVector {
            panic!("scaler artifact is corrupt")
        }

        fn kind(&self) -> &'static str {
            "panicking"
        }
    }

    struct ConstantModel(f64);

    impl PricePredictor for ConstantModel {
        fn predict_log_price(&self, _features: &ScaledFeatureVector) -> f64 {
            self.0
        }

        fn kind(&self) -> &'static str {
            "constant"
        }
    }

    fn identity_scaler() -> Arc<dyn FeatureScaler> {
        Arc::new(StandardScaler::new([0.0; 5], [1.0; 5]))
    }

    fn form(brand: &str, year: &str, transmission: &str, engine: &str, power: &str) -> PredictionForm {
        PredictionForm {
            brand: Some(brand.to_string()),
            year: Some(year.to_string()),
            transmission: Some(transmission.to_string()),
            engine: Some(engine.to_string()),
            max_power: Some(power.to_string()),
        }
    }

    fn build_handler(scaler: Arc<dyn FeatureScaler>, predictor: Arc<dyn PricePredictor>) -> RequestHandler {
        let context = PredictionContext::new(scaler, predictor).unwrap();
        RequestHandler::new(Arc::new(context))
    }

    #[test]
    fn test_validate_trims_fields() {
        let request = validate(&form(" Maruti ", " 2015", "Manual\n", "1200 ", "\t85")).unwrap();
        assert_eq!(request, PredictionRequest::new("Maruti", "2015", "Manual", "1200", "85"));
    }

    #[test]
    fn test_validate_missing_field() {
        let mut submission = form("Maruti", "2015", "Manual", "1200", "85");
        submission.engine = None;
        assert_eq!(validate(&submission), Err(PredictionError::MissingField("engine")));

        submission.engine = Some("   ".to_string());
        assert_eq!(validate(&submission), Err(PredictionError::MissingField("engine")));
    }

    #[test]
    fn test_success_echoes_inputs() {
        let handler = build_handler(identity_scaler(), Arc::new(ConstantModel(10.0)));
        let request_id = Uuid::new_v4();

        let prediction = handler
            .handle_with_id(request_id, &form("Maruti", "2015", "Manual", "1200.0", "85.0"))
            .unwrap();

        assert_eq!(
            prediction,
            PricePrediction {
                request_id,
                brand: "Maruti".to_string(),
                year: 2015,
                transmission: "Manual".to_string(),
                engine: 1200.0,
                max_power: 85.0,
                predicted_price: 22026.47,
            }
        );
    }

    #[test]
    fn test_linear_model_through_handler() {
        let model = LinearRegressor::new([0.0, 0.0, 0.0, 0.0, 0.01], 0.0);
        let handler = build_handler(identity_scaler(), Arc::new(model));

        let prediction = handler.handle(&form("BMW", "2019", "Automatic", "1995", "100")).unwrap();
        assert_eq!(prediction.predicted_price, 2.72);
    }

    #[test]
    fn test_panicking_scaler_is_internal_failure() {
        let handler = build_handler(Arc::new(PanickingScaler), Arc::new(ConstantModel(1.0)));

        let err = handler.handle(&form("Maruti", "2015", "Manual", "1200", "85")).unwrap_err();
        assert_eq!(
            err,
            PredictionError::InternalFailure("scaler artifact is corrupt".to_string())
        );
    }

    #[test]
    fn test_non_finite_model_output() {
        let handler = build_handler(identity_scaler(), Arc::new(ConstantModel(f64::NAN)));
        let err = handler.handle(&form("Maruti", "2015", "Manual", "1200", "85")).unwrap_err();
        assert!(matches!(err, PredictionError::InternalFailure(_)));

        let handler = build_handler(identity_scaler(), Arc::new(ConstantModel(1000.0)));
        let err = handler.handle(&form("Maruti", "2015", "Manual", "1200", "85")).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_huge_price_stays_finite() {
        let handler = build_handler(identity_scaler(), Arc::new(ConstantModel(708.0)));
        let prediction = handler
            .handle(&form("Maruti", "2015", "Manual", "1200", "85"))
            .expect("finite price should be returned");

        assert!(prediction.predicted_price.is_finite());
        assert_eq!(prediction.predicted_price, 708.0_f64.exp());
    }

    #[test]
    fn test_malformed_year_message() {
        let handler = build_handler(identity_scaler(), Arc::new(ConstantModel(1.0)));
        let err = handler
            .handle(&form("Maruti", "not_a_number", "Manual", "1200", "85"))
            .unwrap_err();

        assert!(err.is_user_error());
        assert!(err.to_string().contains("year"));
        assert!(err.to_string().contains("not_a_number"));
    }

    #[test]
    fn test_context_exposes_tables() {
        let context = PredictionContext::new(identity_scaler(), Arc::new(ConstantModel(1.0))).unwrap();
        assert_eq!(context.brands().lookup("Maruti"), Some(12));
        assert_eq!(context.transmissions().lookup("Manual"), Some(1));
    }

    #[test]
    fn test_panic_message_fallback() {
        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(&*payload), "unexpected panic in prediction pipeline");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Predicting.to_string(), "predicting");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
