//! Drawdown amount validation
//!
//! The predicate is a pure function of the requested amount and the facility
//! capacity. It is re-run on every edit and once more before submit.

use crate::types::{AmountInput, AmountParseError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Message shown when the amount is absent, blank or zero
pub const REQUIRED_MESSAGE: &str = "Drawdown amount is required and cannot be blank or zero.";

/// Message shown when the amount is larger than the facility capacity
pub const EXCEEDS_FACILITY_MESSAGE: &str = "Drawdown amount cannot exceed the facility amount.";

/// Message shown when the amount text is not a number
pub const NOT_A_NUMBER_MESSAGE: &str = "Drawdown amount must be a valid number.";

/// Message shown when the amount is below zero
pub const NOT_POSITIVE_MESSAGE: &str = "Drawdown amount must be greater than zero.";

/// Reasons a drawdown amount is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Absent, blank or numerically zero
    #[error("{}", REQUIRED_MESSAGE)]
    Required,

    /// Larger than the facility capacity
    #[error("{}", EXCEEDS_FACILITY_MESSAGE)]
    ExceedsFacility,

    /// Text that does not parse as a decimal
    #[error("{}", NOT_A_NUMBER_MESSAGE)]
    NotANumber,

    /// Negative amount
    #[error("{}", NOT_POSITIVE_MESSAGE)]
    NotPositive,
}

/// Validate a requested amount against the facility capacity
///
/// # Returns
/// - `Ok(amount)` with the parsed amount when it may be submitted
/// - `Err(ValidationError)` describing the first rule that failed
pub fn validate(
    requested: Option<&AmountInput>,
    capacity: Decimal,
) -> Result<Decimal, ValidationError> {
    let input = match requested {
        Some(input) if !input.is_blank() => input,
        _ => return Err(ValidationError::Required),
    };

    let amount = input.parse().map_err(|err| match err {
        AmountParseError::Malformed => ValidationError::NotANumber,
        AmountParseError::OutOfRange { negative: true } => ValidationError::NotPositive,
        AmountParseError::OutOfRange { negative: false } => ValidationError::ExceedsFacility,
    })?;

    if amount.is_zero() {
        return Err(ValidationError::Required);
    }
    if amount.is_sign_negative() {
        return Err(ValidationError::NotPositive);
    }
    if amount > capacity {
        return Err(ValidationError::ExceedsFacility);
    }

    Ok(amount)
}

/// Validity flag plus the inline message displayed next to the field
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationState {
    /// Whether an error is currently shown
    pub show_error: bool,
    /// Message shown inline; empty when valid
    pub message: String,
}

impl ValidationState {
    /// Nothing shown
    #[inline]
    #[must_use]
    pub fn clear() -> Self {
        Self::default()
    }

    /// Error shown with the given message
    #[inline]
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            show_error: true,
            message: message.into(),
        }
    }

    /// True when no error is shown
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.show_error
    }
}

impl From<&Result<Decimal, ValidationError>> for ValidationState {
    fn from(outcome: &Result<Decimal, ValidationError>) -> Self {
        match outcome {
            Ok(_) => Self::clear(),
            Err(err) => Self::invalid(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(raw: &str) -> AmountInput {
        AmountInput::Text(raw.to_string())
    }

    fn capacity() -> Decimal {
        Decimal::new(10_000, 0)
    }

    #[test]
    fn absent_blank_and_zero_are_required() {
        let zero_text = text("0");
        let zero_value = AmountInput::zero();
        let blank = text("   ");
        let empty = text("");

        for input in [None, Some(&empty), Some(&blank), Some(&zero_text), Some(&zero_value)] {
            assert_eq!(validate(input, capacity()), Err(ValidationError::Required));
        }
    }

    #[test]
    fn zero_with_decimals_is_required() {
        assert_eq!(
            validate(Some(&text("0.00")), capacity()),
            Err(ValidationError::Required)
        );
    }

    #[test]
    fn above_capacity_is_rejected() {
        let err = validate(Some(&text("15000")), capacity()).unwrap_err();
        assert_eq!(err, ValidationError::ExceedsFacility);
        assert_eq!(err.to_string(), EXCEEDS_FACILITY_MESSAGE);
    }

    #[test]
    fn equal_to_capacity_is_accepted() {
        assert_eq!(validate(Some(&text("10000")), capacity()), Ok(capacity()));
    }

    #[test]
    fn non_numeric_and_negative_are_rejected() {
        assert_eq!(
            validate(Some(&text("ten")), capacity()),
            Err(ValidationError::NotANumber)
        );
        assert_eq!(
            validate(Some(&text("-5")), capacity()),
            Err(ValidationError::NotPositive)
        );
    }

    #[test]
    fn amounts_beyond_decimal_range_exceed_facility() {
        let thirty_digits = format!("1{}", "0".repeat(29));
        assert_eq!(
            validate(Some(&text(&thirty_digits)), capacity()),
            Err(ValidationError::ExceedsFacility)
        );
        assert_eq!(
            validate(Some(&text("1e30")), capacity()),
            Err(ValidationError::ExceedsFacility)
        );
        assert_eq!(
            validate(Some(&text("-1e30")), capacity()),
            Err(ValidationError::NotPositive)
        );
    }

    #[test]
    fn unloaded_capacity_rejects_any_positive_amount() {
        assert_eq!(
            validate(Some(&text("1")), Decimal::ZERO),
            Err(ValidationError::ExceedsFacility)
        );
    }

    #[test]
    fn validation_state_from_outcome() {
        let ok: Result<Decimal, ValidationError> = Ok(Decimal::ONE);
        assert_eq!(ValidationState::from(&ok), ValidationState::clear());

        let err: Result<Decimal, ValidationError> = Err(ValidationError::Required);
        let state = ValidationState::from(&err);
        assert!(state.show_error);
        assert_eq!(state.message, REQUIRED_MESSAGE);
    }

    proptest! {
        #[test]
        fn prop_above_capacity_is_invalid(capacity in 1i64..1_000_000, excess in 1i64..1_000_000) {
            let cap = Decimal::new(capacity, 2);
            let requested = AmountInput::Value(cap + Decimal::new(excess, 2));
            let outcome = validate(Some(&requested), cap);
            prop_assert_eq!(outcome, Err(ValidationError::ExceedsFacility));
        }

        #[test]
        fn prop_within_capacity_is_valid(capacity in 1i64..1_000_000, requested in 1i64..1_000_000) {
            prop_assume!(requested <= capacity);
            let cap = Decimal::new(capacity, 2);
            let amount = Decimal::new(requested, 2);
            let input = text(&amount.to_string());
            let outcome = validate(Some(&input), cap);
            prop_assert_eq!(outcome, Ok(amount));
            prop_assert_eq!(ValidationState::from(&outcome), ValidationState::clear());
        }

        #[test]
        fn prop_validate_is_idempotent(raw in "[0-9]{0,6}(\\.[0-9]{1,2})?", capacity in 0i64..1_000_000) {
            let input = AmountInput::from_edit(&raw);
            let cap = Decimal::new(capacity, 0);
            prop_assert_eq!(validate(input.as_ref(), cap), validate(input.as_ref(), cap));
        }
    }
}
