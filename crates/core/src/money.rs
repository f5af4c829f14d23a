//! Monetary rounding and range validation.
//!
//! Prices travel as `f64` (JSON numbers, `DOUBLE PRECISION` columns) but
//! every value is rounded through [`Decimal`] so that `123.456` becomes
//! `123.46` rather than whatever binary floating point produces.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CoreError;

/// Number of decimal places stored for prices and margins.
pub const DECIMAL_PLACES: u32 = 2;

/// Largest accepted sale price, in either currency.
pub const MAX_PRICE: f64 = 99_999_999.99;

/// Largest accepted margin percentage.
pub const MAX_MARGIN_PERCENTAGE: f64 = 999.99;

/// Convert f64 to Decimal. Non-finite input becomes zero.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64, rounded to 2 decimal places.
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Round an f64 amount to 2 decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Validate that `value` is a finite number in `[0, max]` and return it
/// rounded to 2 decimal places.
///
/// The range check runs on the raw value, so `100000000` is rejected even
/// though it is only one cent above [`MAX_PRICE`] after rounding.
pub fn validate_amount(value: f64, name: &str, max: f64) -> Result<f64, CoreError> {
    if !value.is_finite() {
        return Err(CoreError::Validation(format!(
            "{name} must be a valid number"
        )));
    }
    if value < 0.0 {
        return Err(CoreError::Validation(format!(
            "{name} must not be negative, got {value}"
        )));
    }
    if value > max {
        return Err(CoreError::Validation(format!(
            "{name} must not exceed {max}, got {value}"
        )));
    }
    Ok(round2(value))
}
