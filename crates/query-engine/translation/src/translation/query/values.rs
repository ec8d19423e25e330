//! Handle the coercion of criteria values to the type of the attribute they are compared with.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use query_engine_metadata::metadata::AttributeType;
use query_engine_sql::sql;

use crate::translation::error::Error;
use crate::translation::values::{parse_boolean, parse_date_time, ScalarValue, TIMESTAMP_FORMAT};

/// Convert a parsed value into a SQL value of the attribute's type.
pub fn coerce_value(
    key: &str,
    value: &ScalarValue,
    attribute_type: AttributeType,
) -> Result<sql::ast::Value, Error> {
    let coerced = match (value, attribute_type) {
        (ScalarValue::String(s), _) => return coerce_raw(key, s, attribute_type),

        (ScalarValue::Integer(i), AttributeType::Integer) => Some(sql::ast::Value::Int4(*i)),
        (ScalarValue::Long(l), AttributeType::Integer) => {
            i32::try_from(*l).ok().map(sql::ast::Value::Int4)
        }
        (ScalarValue::Integer(i), AttributeType::Long) => {
            Some(sql::ast::Value::Int8(i64::from(*i)))
        }
        (ScalarValue::Long(l), AttributeType::Long) => Some(sql::ast::Value::Int8(*l)),

        (ScalarValue::Float(f), AttributeType::Float) => Some(sql::ast::Value::Float4(*f)),
        (ScalarValue::Float(f), AttributeType::Double) => {
            Some(sql::ast::Value::Float8(f64::from(*f)))
        }
        (ScalarValue::Double(d), AttributeType::Double) => Some(sql::ast::Value::Float8(*d)),
        (ScalarValue::Integer(i), AttributeType::Double) => {
            Some(sql::ast::Value::Float8(f64::from(*i)))
        }

        (ScalarValue::Boolean(b), AttributeType::Boolean) => Some(sql::ast::Value::Bool(*b)),

        (
            ScalarValue::DateTime(t) | ScalarValue::Timestamp(t),
            AttributeType::DateTime | AttributeType::Timestamp,
        ) => Some(sql::ast::Value::Timestamp(*t)),
        // Only a midnight value names a whole day.
        (ScalarValue::DateTime(t) | ScalarValue::Timestamp(t), AttributeType::Date) => {
            (t.time() == NaiveTime::MIN).then(|| sql::ast::Value::Date(t.date()))
        }

        (other, AttributeType::String) => Some(sql::ast::Value::String(other.to_string())),

        _ => None,
    };

    coerced.ok_or_else(|| coercion_error(key, &value.to_string(), attribute_type))
}

/// Parse a raw string as the attribute's type.
pub fn coerce_raw(
    key: &str,
    raw: &str,
    attribute_type: AttributeType,
) -> Result<sql::ast::Value, Error> {
    let coerced = match attribute_type {
        AttributeType::Integer => raw.parse().ok().map(sql::ast::Value::Int4),
        AttributeType::Long => raw.parse().ok().map(sql::ast::Value::Int8),
        AttributeType::Float => raw
            .parse::<f32>()
            .ok()
            .filter(|f| f.is_finite())
            .map(sql::ast::Value::Float4),
        AttributeType::Double => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(sql::ast::Value::Float8),
        AttributeType::Boolean => parse_boolean(raw).map(sql::ast::Value::Bool),
        AttributeType::String => Some(sql::ast::Value::String(raw.to_string())),
        AttributeType::Date => NaiveDate::parse_from_str(raw, sql::string::DATE_FORMAT)
            .ok()
            .map(sql::ast::Value::Date),
        AttributeType::DateTime | AttributeType::Timestamp => parse_date_time(raw)
            .or_else(|| NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok())
            .map(sql::ast::Value::Timestamp),
        AttributeType::Json => None,
    };

    coerced.ok_or_else(|| coercion_error(key, raw, attribute_type))
}

fn coercion_error(key: &str, value: &str, attribute_type: AttributeType) -> Error {
    Error::ValueCoercion {
        key: key.to_string(),
        value: value.to_string(),
        attribute_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widens_integers() {
        assert_eq!(
            coerce_value("id", &ScalarValue::Integer(7), AttributeType::Long),
            Ok(sql::ast::Value::Int8(7))
        );
        assert_eq!(
            coerce_value("salary", &ScalarValue::Integer(7), AttributeType::Double),
            Ok(sql::ast::Value::Float8(7.0))
        );
    }

    #[test]
    fn narrowing_out_of_range_fails() {
        assert_eq!(
            coerce_value("age", &ScalarValue::Long(1 << 40), AttributeType::Integer),
            Err(Error::ValueCoercion {
                key: "age".to_string(),
                value: "1099511627776".to_string(),
                attribute_type: AttributeType::Integer,
            })
        );
    }

    #[test]
    fn strings_are_parsed_as_the_attribute_type() {
        assert_eq!(
            coerce_value(
                "hired_on",
                &ScalarValue::String("2020-02-29".to_string()),
                AttributeType::Date
            ),
            Ok(sql::ast::Value::Date(
                NaiveDate::from_ymd_opt(2020, 2, 29).unwrap()
            ))
        );
        assert!(matches!(
            coerce_value(
                "age",
                &ScalarValue::String("old".to_string()),
                AttributeType::Integer
            ),
            Err(Error::ValueCoercion { .. })
        ));
    }

    #[test]
    fn midnight_date_time_narrows_to_date() {
        let value = ScalarValue::DateTime(
            NaiveDate::from_ymd_opt(2024, 5, 6)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        assert_eq!(
            coerce_value("hired_on", &value, AttributeType::Date),
            Ok(sql::ast::Value::Date(
                NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
            ))
        );
    }

    #[test]
    fn date_time_with_a_time_of_day_is_not_a_date() {
        let value = ScalarValue::DateTime(
            NaiveDate::from_ymd_opt(2020, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        );
        assert_eq!(
            coerce_value("hired_on", &value, AttributeType::Date),
            Err(Error::ValueCoercion {
                key: "hired_on".to_string(),
                value: "2020-01-01T12:00:00".to_string(),
                attribute_type: AttributeType::Date,
            })
        );
    }

    #[test]
    fn non_finite_strings_are_not_numbers() {
        for raw in ["NaN", "inf", "-infinity"] {
            assert!(matches!(
                coerce_value(
                    "salary",
                    &ScalarValue::String(raw.to_string()),
                    AttributeType::Double
                ),
                Err(Error::ValueCoercion { .. })
            ));
        }
    }

    #[test]
    fn booleans_do_not_become_numbers() {
        assert!(coerce_value("age", &ScalarValue::Boolean(true), AttributeType::Integer).is_err());
    }
}
