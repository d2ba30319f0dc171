//! Typed cell codecs
//!
//! A [`ToCellValue`] converts a native value into a [`CellValue`] plus an
//! optional [`NumberFormat`] hint (dates want a date format, decimals a
//! decimal format). A [`FromCellValue`] converts back, failing with a typed
//! [`CodecError`] on a type-incompatible cell.
//!
//! Round-trip law: for every codec, `T::from_cell_value(&v.to_cell_value().0)`
//! returns the original value.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::cell::CellValue;
use crate::style::NumberFormat;

/// Typed codec failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot read {target_type} from {source_kind} cell: {reason}")]
pub struct CodecError {
    /// Kind of the source cell value (e.g. "text")
    pub source_kind: &'static str,
    /// Target native type name
    pub target_type: &'static str,
    /// Human-readable reason
    pub reason: String,
}

impl CodecError {
    fn mismatch(value: &CellValue, target: &'static str) -> Self {
        Self {
            source_kind: value.type_name(),
            target_type: target,
            reason: "incompatible value type".into(),
        }
    }
}

/// Convert a native value into a cell value with an optional format hint
pub trait ToCellValue {
    /// Produce the cell value and an optional number-format hint
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>);
}

/// Convert a cell value back into a native value
pub trait FromCellValue: Sized {
    /// Read the native value, or fail with a typed error.
    ///
    /// An `Empty` cell reads as `Ok(None)`; an incompatible cell fails.
    fn from_cell_value(value: &CellValue) -> Result<Option<Self>, CodecError>;
}

impl ToCellValue for f64 {
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>) {
        (CellValue::Number(*self), None)
    }
}

impl FromCellValue for f64 {
    fn from_cell_value(value: &CellValue) -> Result<Option<Self>, CodecError> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::Number(n) => Ok(Some(*n)),
            other => Err(CodecError::mismatch(other, "f64")),
        }
    }
}

impl ToCellValue for i64 {
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>) {
        (CellValue::Number(*self as f64), Some(NumberFormat::Integer))
    }
}

impl FromCellValue for i64 {
    fn from_cell_value(value: &CellValue) -> Result<Option<Self>, CodecError> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::Number(n) if n.fract() == 0.0 => Ok(Some(*n as i64)),
            CellValue::Number(_) => Err(CodecError {
                source_kind: "number",
                target_type: "i64",
                reason: "number has a fractional part".into(),
            }),
            other => Err(CodecError::mismatch(other, "i64")),
        }
    }
}

impl ToCellValue for i32 {
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>) {
        (CellValue::Number(*self as f64), Some(NumberFormat::Integer))
    }
}

impl FromCellValue for i32 {
    fn from_cell_value(value: &CellValue) -> Result<Option<Self>, CodecError> {
        match i64::from_cell_value(value)? {
            None => Ok(None),
            Some(n) => i32::try_from(n).map(Some).map_err(|_| CodecError {
                source_kind: "number",
                target_type: "i32",
                reason: "out of range".into(),
            }),
        }
    }
}

impl ToCellValue for bool {
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>) {
        (CellValue::Boolean(*self), None)
    }
}

impl FromCellValue for bool {
    fn from_cell_value(value: &CellValue) -> Result<Option<Self>, CodecError> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::Boolean(b) => Ok(Some(*b)),
            other => Err(CodecError::mismatch(other, "bool")),
        }
    }
}

impl ToCellValue for String {
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>) {
        (CellValue::text(self.clone()), None)
    }
}

impl ToCellValue for &str {
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>) {
        (CellValue::text(*self), None)
    }
}

impl FromCellValue for String {
    fn from_cell_value(value: &CellValue) -> Result<Option<Self>, CodecError> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::Text(s) => Ok(Some(s.as_str().to_string())),
            rich @ CellValue::RichText(_) => Ok(rich.plain_text()),
            other => Err(CodecError::mismatch(other, "String")),
        }
    }
}

impl ToCellValue for Decimal {
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>) {
        (
            CellValue::Number(self.to_f64().unwrap_or(f64::NAN)),
            Some(NumberFormat::Decimal),
        )
    }
}

impl FromCellValue for Decimal {
    fn from_cell_value(value: &CellValue) -> Result<Option<Self>, CodecError> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::Number(n) => Decimal::from_f64(*n).map(Some).ok_or(CodecError {
                source_kind: "number",
                target_type: "Decimal",
                reason: "not representable as a decimal".into(),
            }),
            other => Err(CodecError::mismatch(other, "Decimal")),
        }
    }
}

impl ToCellValue for NaiveDateTime {
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>) {
        (CellValue::DateTime(*self), Some(NumberFormat::DateTime))
    }
}

impl FromCellValue for NaiveDateTime {
    fn from_cell_value(value: &CellValue) -> Result<Option<Self>, CodecError> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::DateTime(dt) => Ok(Some(*dt)),
            other => Err(CodecError::mismatch(other, "NaiveDateTime")),
        }
    }
}

impl ToCellValue for NaiveDate {
    fn to_cell_value(&self) -> (CellValue, Option<NumberFormat>) {
        let midnight = self.and_hms_opt(0, 0, 0).unwrap_or_default();
        (CellValue::DateTime(midnight), Some(NumberFormat::Date))
    }
}

impl FromCellValue for NaiveDate {
    fn from_cell_value(value: &CellValue) -> Result<Option<Self>, CodecError> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::DateTime(dt) => Ok(Some(dt.date())),
            other => Err(CodecError::mismatch(other, "NaiveDate")),
        }
    }
}
