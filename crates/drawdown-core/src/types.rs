//! Core types for the drawdown validator
//!
//! Defines the fundamental types shared by every module:
//! - Record identifiers (typed per object)
//! - The requested amount as held by the form
//! - Records and field maps exchanged with the record store

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Opaque record identifier issued by the record store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a raw identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a host-supplied identifier; blank means "not yet known"
    #[must_use]
    pub fn from_input(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self::new(trimmed))
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! typed_record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(RecordId);

        impl $name {
            /// Wrap a raw identifier
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(RecordId::new(id))
            }

            /// Underlying store identifier
            #[inline]
            #[must_use]
            pub fn record_id(&self) -> &RecordId {
                &self.0
            }
        }

        impl From<RecordId> for $name {
            fn from(id: RecordId) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

typed_record_id!(
    /// Identifier of the activity record carrying the drawdown amount
    ActivityId
);

typed_record_id!(
    /// Identifier of the case (facility) record carrying the capacity limit
    CaseId
);

/// Requested amount as currently held by the form
///
/// Loaded amounts arrive as decimals; edited amounts stay as the raw text
/// the user typed until validation parses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// Decimal value read from the record
    Value(Decimal),
    /// Raw text from an edit event
    Text(String),
}

impl AmountInput {
    /// Zero amount, used as the default and after cancel
    #[inline]
    #[must_use]
    pub fn zero() -> Self {
        Self::Value(Decimal::ZERO)
    }

    /// Normalize an edit event value. Empty text is absent, never zero.
    #[must_use]
    pub fn from_edit(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self::Text(raw.to_string()))
        }
    }

    /// True when the input holds nothing but whitespace
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Value(_) => false,
            Self::Text(text) => text.trim().is_empty(),
        }
    }

    /// Loose decimal parse of the input
    pub fn parse(&self) -> Result<Decimal, AmountParseError> {
        match self {
            Self::Value(value) => Ok(*value),
            Self::Text(text) => parse_amount(text),
        }
    }
}

impl From<Decimal> for AmountInput {
    fn from(value: Decimal) -> Self {
        Self::Value(value)
    }
}

/// Parse plain or scientific decimal notation, ignoring surrounding whitespace
#[must_use]
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Why amount text did not yield a decimal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountParseError {
    /// Not numeric text
    Malformed,
    /// Numeric, but beyond the range of a decimal
    OutOfRange {
        /// Below zero
        negative: bool,
    },
}

/// Parse edited amount text, telling malformed text apart from numbers too
/// large to hold
///
/// Magnitudes too small to hold round to zero.
pub fn parse_amount(text: &str) -> Result<Decimal, AmountParseError> {
    if let Some(value) = parse_decimal(text) {
        return Ok(value);
    }
    match text.trim().parse::<f64>() {
        Ok(float) if float.is_finite() => match Decimal::from_f64(float) {
            Some(value) => Ok(value),
            None if float.abs() >= 1.0 => Err(AmountParseError::OutOfRange {
                negative: float.is_sign_negative(),
            }),
            None => Ok(Decimal::ZERO),
        },
        _ => Err(AmountParseError::Malformed),
    }
}

/// Field values sent with an update, keyed by field API name
pub type FieldValues = BTreeMap<String, Value>;

/// Convert a decimal into a JSON number for an update payload
///
/// Digits are carried verbatim; the number is never routed through `f64`.
#[must_use]
pub fn decimal_to_json(value: Decimal) -> Value {
    let digits = value.normalize().to_string();
    Number::from_str(&digits).map_or(Value::String(digits), Value::Number)
}

/// Field could not be read as the expected type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field {field} holds {found}, expected {expected}")]
pub struct FieldTypeError {
    /// Field API name
    pub field: String,
    /// Expected kind of value
    pub expected: &'static str,
    /// JSON kind actually found
    pub found: &'static str,
}

/// A record as returned by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier
    pub id: RecordId,
    /// Requested fields, keyed by field API name
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record
    #[inline]
    #[must_use]
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            fields: Map::new(),
        }
    }

    /// Set a field value
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Read a decimal field. Missing, null and empty-string values are `None`.
    pub fn decimal_field(&self, name: &str) -> Result<Option<Decimal>, FieldTypeError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(number)) => parse_decimal(&number.to_string())
                .map(Some)
                .ok_or_else(|| type_error(name, "decimal", "number")),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => parse_decimal(text)
                .map(Some)
                .ok_or_else(|| type_error(name, "decimal", "string")),
            Some(other) => Err(type_error(name, "decimal", json_kind(other))),
        }
    }

    /// Read a reference field. Missing, null and blank values are `None`.
    pub fn reference_field(&self, name: &str) -> Result<Option<RecordId>, FieldTypeError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(RecordId::from_input(text)),
            Some(other) => Err(type_error(name, "reference", json_kind(other))),
        }
    }
}

fn type_error(field: &str, expected: &'static str, found: &'static str) -> FieldTypeError {
    FieldTypeError {
        field: field.to_string(),
        expected,
        found,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
