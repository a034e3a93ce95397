// HTTP API

pub mod server;

pub use server::{routes, AppState, PredictionServer};
