use crate::core::{FeatureVector, PredictionError, PredictionRequest, PredictionResult};
use crate::encoding::EncodingTable;

/// Build the model input vector for one request.
///
/// Checks run in a fixed order: brand, transmission, year, engine, max_power.
/// Values are not range-checked.
pub fn assemble(
    request: &PredictionRequest,
    brands: &EncodingTable,
    transmissions: &EncodingTable,
) -> PredictionResult<FeatureVector> {
    let brand_code = brands
        .lookup(&request.brand)
        .ok_or_else(|| PredictionError::UnknownBrand(request.brand.clone()))?;

    let transmission_code = transmissions
        .lookup(&request.transmission)
        .ok_or_else(|| PredictionError::UnknownTransmission(request.transmission.clone()))?;

    let year = request
        .year
        .parse::<i64>()
        .map_err(|_| malformed("year", &request.year))?;

    let engine = parse_float("engine", &request.engine)?;
    let max_power = parse_float("max_power", &request.max_power)?;

    Ok(FeatureVector {
        brand_code,
        year,
        transmission_code,
        engine,
        max_power,
    })
}

fn parse_float(field: &'static str, value: &str) -> PredictionResult<f64> {
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(malformed(field, value)),
    }
}

fn malformed(field: &'static str, value: &str) -> PredictionError {
    PredictionError::MalformedInput {
        field,
        value: value.to_string(),
    }
}
