//! Used car price prediction behind a small web form.
//!
//! A submission is encoded into a fixed five-column feature vector, scaled
//! with a pre-fitted scaler, run through a pre-trained regression model that
//! predicts the log price, and converted back to a price.

pub mod api;
pub mod core;
pub mod encoding;
pub mod features;
pub mod handler;
pub mod ml;
pub mod monitoring;
pub mod templates;

pub use crate::core::{PredictionError, PredictionForm, PricePrediction, Settings};
pub use crate::handler::{PredictionContext, RequestHandler};
