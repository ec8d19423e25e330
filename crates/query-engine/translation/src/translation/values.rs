//! Parsing raw parameter strings into typed values, and rendering typed values as SQL values.

use std::fmt;

use chrono::NaiveDateTime;
use query_engine_metadata::metadata::FieldType;
use query_engine_sql::sql;
use thiserror::Error;

/// Accepted form of a DATE_TIME parameter; seconds and fractions are optional.
pub const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Accepted form of a TIMESTAMP parameter.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Separates the items of an IN parameter.
pub const LIST_SEPARATOR: char = ',';

/// A parsed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    DateTime(NaiveDateTime),
    Timestamp(NaiveDateTime),
}

/// A raw string that does not parse as the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{raw} is invalid value for type {field_type}")]
pub struct ParseValueError {
    pub raw: String,
    pub field_type: FieldType,
}

impl ScalarValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            ScalarValue::Integer(_) => FieldType::Integer,
            ScalarValue::Long(_) => FieldType::Long,
            ScalarValue::Float(_) => FieldType::Float,
            ScalarValue::Double(_) => FieldType::Double,
            ScalarValue::Boolean(_) => FieldType::Boolean,
            ScalarValue::String(_) => FieldType::String,
            ScalarValue::DateTime(_) => FieldType::DateTime,
            ScalarValue::Timestamp(_) => FieldType::Timestamp,
        }
    }

    pub fn to_sql_value(&self) -> sql::ast::Value {
        match self {
            ScalarValue::Integer(i) => sql::ast::Value::Int4(*i),
            ScalarValue::Long(l) => sql::ast::Value::Int8(*l),
            ScalarValue::Float(f) => sql::ast::Value::Float4(*f),
            ScalarValue::Double(d) => sql::ast::Value::Float8(*d),
            ScalarValue::Boolean(b) => sql::ast::Value::Bool(*b),
            ScalarValue::String(s) => sql::ast::Value::String(s.clone()),
            ScalarValue::DateTime(t) | ScalarValue::Timestamp(t) => {
                sql::ast::Value::Timestamp(*t)
            }
        }
    }

    pub fn to_param(&self) -> sql::string::Param {
        match self {
            ScalarValue::String(s) => sql::string::Param::String(s.clone()),
            other => sql::string::Param::Value(other.to_sql_value()),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(i) => write!(f, "{i}"),
            ScalarValue::Long(l) => write!(f, "{l}"),
            ScalarValue::Float(x) => write!(f, "{x}"),
            ScalarValue::Double(x) => write!(f, "{x}"),
            ScalarValue::Boolean(b) => write!(f, "{b}"),
            ScalarValue::String(s) => f.write_str(s),
            ScalarValue::DateTime(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S%.f")),
            ScalarValue::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Parse a raw string as the given type. Numbers and temporal values must
/// match exactly; booleans accept `true` and `false` in any case.
pub fn parse_value(field_type: FieldType, raw: &str) -> Result<ScalarValue, ParseValueError> {
    let invalid = || ParseValueError {
        raw: raw.to_string(),
        field_type,
    };
    match field_type {
        FieldType::Integer => raw.parse().map(ScalarValue::Integer).map_err(|_| invalid()),
        FieldType::Long => raw.parse().map(ScalarValue::Long).map_err(|_| invalid()),
        FieldType::Float => raw
            .parse::<f32>()
            .ok()
            .filter(|f| f.is_finite())
            .map(ScalarValue::Float)
            .ok_or_else(invalid),
        FieldType::Double => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(ScalarValue::Double)
            .ok_or_else(invalid),
        FieldType::Boolean => parse_boolean(raw)
            .map(ScalarValue::Boolean)
            .ok_or_else(invalid),
        FieldType::String => Ok(ScalarValue::String(raw.to_string())),
        FieldType::DateTime => parse_date_time(raw)
            .map(ScalarValue::DateTime)
            .ok_or_else(invalid),
        FieldType::Timestamp => NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .map(ScalarValue::Timestamp)
            .map_err(|_| invalid()),
    }
}

/// Split an IN parameter into trimmed items and parse each one.
pub fn parse_list(field_type: FieldType, raw: &str) -> Result<Vec<ScalarValue>, ParseValueError> {
    split_list(raw)
        .map(|item| parse_value(field_type, item))
        .collect()
}

pub fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(LIST_SEPARATOR).map(str::trim)
}

pub fn parse_boolean(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}
