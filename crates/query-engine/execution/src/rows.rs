//! Decode rows whose columns are only known once a statement has run.
//!
//! The first time a statement runs, its result columns are turned into a
//! [`RowShape`], which is cached under a key identifying the statement (the
//! template text, or the root entity). Every row is then decoded following the
//! shape into a [`DynamicRow`], an ordered map from column name to value.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::{Column, Row, TypeInfo};

use crate::error::Error;

/// How many shapes are kept before the least used are evicted.
pub const DEFAULT_ROW_SHAPE_CAPACITY: u64 = 1024;

/// The Rust type a column is decoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Text,
    Uuid,
    Json,
    Date,
    Timestamp,
    TimestampTz,
    Unsupported,
}

impl ColumnKind {
    /// Map a PostgreSQL type name, as reported by the driver, to a kind.
    pub fn from_type_name(type_name: &str) -> ColumnKind {
        match type_name {
            "BOOL" => ColumnKind::Bool,
            "INT2" => ColumnKind::Int2,
            "INT4" => ColumnKind::Int4,
            "INT8" => ColumnKind::Int8,
            "FLOAT4" => ColumnKind::Float4,
            "FLOAT8" => ColumnKind::Float8,
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => ColumnKind::Text,
            "UUID" => ColumnKind::Uuid,
            "JSON" | "JSONB" => ColumnKind::Json,
            "DATE" => ColumnKind::Date,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "TIMESTAMPTZ" => ColumnKind::TimestampTz,
            _ => ColumnKind::Unsupported,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnShape {
    pub name: String,
    pub type_name: String,
    pub kind: ColumnKind,
}

/// The ordered columns of a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowShape {
    columns: Vec<ColumnShape>,
}

impl RowShape {
    pub fn new(columns: Vec<ColumnShape>) -> Self {
        RowShape { columns }
    }

    pub fn from_columns(columns: &[PgColumn]) -> Self {
        RowShape::new(
            columns
                .iter()
                .map(|column| {
                    let type_name = column.type_info().name();
                    ColumnShape {
                        name: column.name().to_string(),
                        type_name: type_name.to_string(),
                        kind: ColumnKind::from_type_name(type_name),
                    }
                })
                .collect(),
        )
    }

    pub fn columns(&self) -> &[ColumnShape] {
        &self.columns
    }
}

/// A decoded column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl DynamicValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DynamicValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers are widened, as `serde_json::Value::as_f64` does.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DynamicValue::Float(f) => Some(*f),
            DynamicValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<uuid::Uuid> {
        match self {
            DynamicValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            DynamicValue::Json(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DynamicValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// A timestamp with a time zone is read in UTC.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            DynamicValue::Timestamp(t) => Some(*t),
            DynamicValue::TimestampTz(t) => Some(t.naive_utc()),
            _ => None,
        }
    }

    pub fn as_timestamp_tz(&self) -> Option<DateTime<Utc>> {
        match self {
            DynamicValue::TimestampTz(t) => Some(*t),
            _ => None,
        }
    }
}

/// A decoded row: column names to values, in result order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct DynamicRow(IndexMap<String, DynamicValue>);

impl DynamicRow {
    pub fn get(&self, column: &str) -> Option<&DynamicValue> {
        self.0.get(column)
    }

    /// Is the column absent, or SQL NULL?
    pub fn is_null(&self, column: &str) -> bool {
        self.get(column).map_or(true, DynamicValue::is_null)
    }

    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(DynamicValue::as_bool)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(DynamicValue::as_i64)
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(DynamicValue::as_f64)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(DynamicValue::as_str)
    }

    pub fn get_uuid(&self, column: &str) -> Option<uuid::Uuid> {
        self.get(column).and_then(DynamicValue::as_uuid)
    }

    pub fn get_json(&self, column: &str) -> Option<&serde_json::Value> {
        self.get(column).and_then(DynamicValue::as_json)
    }

    pub fn get_date(&self, column: &str) -> Option<NaiveDate> {
        self.get(column).and_then(DynamicValue::as_date)
    }

    pub fn get_timestamp(&self, column: &str) -> Option<NaiveDateTime> {
        self.get(column).and_then(DynamicValue::as_timestamp)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: DynamicValue) {
        self.0.insert(column.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DynamicValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, DynamicValue)> for DynamicRow {
    fn from_iter<I: IntoIterator<Item = (String, DynamicValue)>>(iter: I) -> Self {
        DynamicRow(iter.into_iter().collect())
    }
}

/// Decode every column of a row following its shape.
pub fn decode_row(shape: &RowShape, row: &PgRow) -> Result<DynamicRow, Error> {
    if row.len() != shape.columns().len() {
        return Err(Error::Decode {
            column: "*".to_string(),
            reason: format!(
                "expected {} columns, found {}",
                shape.columns().len(),
                row.len()
            ),
        });
    }
    shape
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| Ok((column.name.clone(), decode_column(row, index, column)?)))
        .collect()
}

fn decode_column(row: &PgRow, index: usize, column: &ColumnShape) -> Result<DynamicValue, Error> {
    let value = match column.kind {
        ColumnKind::Bool => decode::<bool>(row, index, column)?.map(DynamicValue::Bool),
        ColumnKind::Int2 => {
            decode::<i16>(row, index, column)?.map(|v| DynamicValue::Integer(v.into()))
        }
        ColumnKind::Int4 => {
            decode::<i32>(row, index, column)?.map(|v| DynamicValue::Integer(v.into()))
        }
        ColumnKind::Int8 => decode::<i64>(row, index, column)?.map(DynamicValue::Integer),
        ColumnKind::Float4 => {
            decode::<f32>(row, index, column)?.map(|v| DynamicValue::Float(v.into()))
        }
        ColumnKind::Float8 => decode::<f64>(row, index, column)?.map(DynamicValue::Float),
        ColumnKind::Text => decode::<String>(row, index, column)?.map(DynamicValue::Text),
        ColumnKind::Uuid => decode::<uuid::Uuid>(row, index, column)?.map(DynamicValue::Uuid),
        ColumnKind::Json => {
            decode::<serde_json::Value>(row, index, column)?.map(DynamicValue::Json)
        }
        ColumnKind::Date => decode::<NaiveDate>(row, index, column)?.map(DynamicValue::Date),
        ColumnKind::Timestamp => {
            decode::<NaiveDateTime>(row, index, column)?.map(DynamicValue::Timestamp)
        }
        ColumnKind::TimestampTz => {
            decode::<DateTime<Utc>>(row, index, column)?.map(DynamicValue::TimestampTz)
        }
        ColumnKind::Unsupported => {
            return Err(Error::Decode {
                column: column.name.clone(),
                reason: format!(
                    "unsupported column type {}; cast it in the query",
                    column.type_name
                ),
            })
        }
    };
    Ok(value.unwrap_or(DynamicValue::Null))
}

fn decode<'r, T>(row: &'r PgRow, index: usize, column: &ColumnShape) -> Result<Option<T>, Error>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .map_err(|error| Error::Decode {
            column: column.name.clone(),
            reason: error.to_string(),
        })
}

/// Row shapes shared by every request, keyed by statement identity.
#[derive(Clone)]
pub struct RowShapeCache {
    shapes: moka::sync::Cache<String, Arc<RowShape>>,
}

impl Default for RowShapeCache {
    fn default() -> Self {
        RowShapeCache::new(DEFAULT_ROW_SHAPE_CAPACITY)
    }
}

impl RowShapeCache {
    pub fn new(max_capacity: u64) -> Self {
        RowShapeCache {
            shapes: moka::sync::Cache::new(max_capacity),
        }
    }

    /// The shape cached under `key`, building it on first use. Concurrent
    /// callers for the same key wait for a single build. The flag is `true`
    /// for the caller whose closure built the shape.
    pub fn get_or_build(
        &self,
        key: &str,
        build: impl FnOnce() -> RowShape,
    ) -> (Arc<RowShape>, bool) {
        let mut built = false;
        let shape = self.shapes.get_with(key.to_string(), || {
            built = true;
            Arc::new(build())
        });
        (shape, built)
    }

    pub fn get(&self, key: &str) -> Option<Arc<RowShape>> {
        self.shapes.get(key)
    }
}
