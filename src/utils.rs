//! Various assorted utility functions used throughout the package.
use crate::errors::MctreeError;

/// Validate that a float parameter falls within `[min, max]` and is not NaN.
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), MctreeError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(MctreeError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a float parameter is finite and non-negative.
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), MctreeError> {
    validate_float_parameter(value, 0.0, f64::INFINITY, parameter)
}
