//! Type definitions of a low-level SQL string representation.

use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ast::Value;

/// Format used when rendering a date literal.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used when rendering a timestamp literal.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// How values are placed into generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ValueBinding {
    /// Emit `$n` placeholders and bind the values separately.
    #[default]
    Parameters,
    /// Emit escaped literals directly into the SQL text.
    InlineLiterals,
}

/// A SQL statement being built, along with the values bound to its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct SQL {
    pub sql: String,
    pub params: Vec<Param>,
    /// for internal use and tests only
    pub param_index: u64,
    pub binding: ValueBinding,
}

impl Default for SQL {
    fn default() -> Self {
        Self::new()
    }
}

/// A parameter for a parameterized query.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A literal string
    String(String),
    /// A typed value
    Value(Value),
}

impl SQL {
    pub fn new() -> SQL {
        SQL::with_binding(ValueBinding::Parameters)
    }

    pub fn with_binding(binding: ValueBinding) -> SQL {
        SQL {
            sql: String::new(),
            params: vec![],
            param_index: 0,
            binding,
        }
    }

    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append a double-quoted identifier.
    pub fn append_identifier(&mut self, sql: &str) {
        self.sql.push('"');
        self.sql.push_str(&sql.replace('"', "\"\""));
        self.sql.push('"');
    }

    pub fn append_param(&mut self, param: Param) {
        match self.binding {
            ValueBinding::Parameters => {
                self.param_index += 1;
                self.sql.push_str(format!("${}", self.param_index).as_str());
                self.params.push(param);
            }
            ValueBinding::InlineLiterals => {
                let literal = param.to_literal();
                self.sql.push_str(&literal);
            }
        }
    }
}

impl Param {
    /// Render this parameter as a SQL literal. Text, dates and timestamps are
    /// single-quoted with embedded quotes doubled.
    pub fn to_literal(&self) -> String {
        match self {
            Param::String(s) => quote_literal(s),
            Param::Value(value) => match value {
                Value::Int4(i) => i.to_string(),
                Value::Int8(i) => i.to_string(),
                Value::Float4(f) => f.to_string(),
                Value::Float8(f) => f.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Date(date) => quote_literal(&format_date(*date)),
                Value::Timestamp(timestamp) => quote_literal(&format_timestamp(*timestamp)),
                Value::String(s) => quote_literal(s),
            },
        }
    }
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
