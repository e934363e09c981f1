//! Mapping between Rust field types, semantic column types and result cells.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::field::FieldType;
use crate::expr::Value;
use crate::expr::value::parse_timestamp;

/// A Rust type that can be stored in one column.
///
/// Result cells arrive as optional text whatever the backend, so decoding goes through
/// [`from_text`](Column::from_text).
pub trait Column: Sized {
    /// Semantic type used when the field carries no `type:` annotation.
    const FIELD_TYPE: FieldType;
    const UNSIGNED: bool = false;
    /// `Option<T>` columns are nullable.
    const NULLABLE: bool = false;

    /// Value rendered into generated SQL.
    fn to_value(&self) -> Value;

    /// Parse a non-null cell. `None` when the text does not parse.
    fn from_text(text: &str) -> Option<Self>;

    /// Decode a possibly-null cell. `None` means the cell cannot be assigned.
    fn from_cell(cell: Option<&str>) -> Option<Self> {
        cell.and_then(Self::from_text)
    }
}

macro_rules! int_column {
    ($field_type:ident, $unsigned:literal: $($t:ty),+) => {
        $(
            impl Column for $t {
                const FIELD_TYPE: FieldType = FieldType::$field_type;
                const UNSIGNED: bool = $unsigned;

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn from_text(text: &str) -> Option<Self> {
                    let text = text.trim();
                    if let Ok(v) = text.parse() {
                        return Some(v);
                    }
                    // integral values read back through a REAL or DECIMAL affinity, e.g. "3.0"
                    let d = Decimal::from_str(text).ok().filter(|d| d.fract().is_zero())?;
                    d.normalize().to_string().parse().ok()
                }
            }
        )+
    };
}

int_column!(Int, false: i8, i16, i32);
int_column!(Int, true: u8, u16, u32);
int_column!(Long, false: i64);
int_column!(Long, true: u64);

impl Column for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_text(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        }
    }
}

impl Column for f32 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl Column for f64 {
    const FIELD_TYPE: FieldType = FieldType::Double;

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl Column for Decimal {
    const FIELD_TYPE: FieldType = FieldType::Decimal;

    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }

    fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok()
    }
}

impl Column for String {
    const FIELD_TYPE: FieldType = FieldType::String;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_text(text: &str) -> Option<Self> {
        Some(text.to_owned())
    }
}

impl Column for char {
    const FIELD_TYPE: FieldType = FieldType::Char;

    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn from_text(text: &str) -> Option<Self> {
        text.chars().next()
    }
}

impl Column for DateTime<Utc> {
    const FIELD_TYPE: FieldType = FieldType::DateTime;

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_text(text: &str) -> Option<Self> {
        parse_timestamp(text)
    }
}

impl Column for NaiveDateTime {
    const FIELD_TYPE: FieldType = FieldType::DateTime;

    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn from_text(text: &str) -> Option<Self> {
        parse_timestamp(text).map(|ts| ts.naive_utc())
    }
}

impl Column for Uuid {
    const FIELD_TYPE: FieldType = FieldType::Uuid;

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_text(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok()
    }
}

impl<T: Column> Column for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const UNSIGNED: bool = T::UNSIGNED;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Column::to_value)
    }

    fn from_text(text: &str) -> Option<Self> {
        T::from_text(text).map(Some)
    }

    fn from_cell(cell: Option<&str>) -> Option<Self> {
        match cell {
            None => Some(None),
            Some(text) => Self::from_text(text),
        }
    }
}
