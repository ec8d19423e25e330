//! Page requests, sort orders and paged responses.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use query_engine_sql::sql;
use serde::{Deserialize, Serialize};

use super::error::{Error, ValidationError};
use super::template::column_for_key;

/// The parameter reported when a sort column is not allowed.
pub const SORT_PARAMETER: &str = "sortBy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(self) -> sql::ast::OrderByDirection {
        match self {
            SortDirection::Asc => sql::ast::OrderByDirection::Asc,
            SortDirection::Desc => sql::ast::OrderByDirection::Desc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        })
    }
}

impl FromStr for SortDirection {
    type Err = String;

    /// Case-insensitive `asc` or `desc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(format!("{s} is not a sort direction"))
        }
    }
}

/// A column, or a `__` separated path, to sort by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// A zero-based page of `size` rows, optionally sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        PageRequest {
            page,
            size,
            sort: None,
        }
    }

    /// Sort by `column`. An empty column leaves the request unsorted.
    #[must_use]
    pub fn sorted_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        let column = column.into();
        self.sort = if column.is_empty() {
            None
        } else {
            Some(SortOrder { column, direction })
        };
        self
    }

    /// Keep the size within `1..=max_size`, using `default_size` for zero.
    #[must_use]
    pub fn clamped(mut self, default_size: u32, max_size: u32) -> Self {
        if self.size == 0 {
            self.size = default_size;
        }
        self.size = self.size.min(max_size).max(1);
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    pub fn limit(&self) -> sql::ast::Limit {
        sql::helpers::page_limit(self.size, self.offset())
    }

    /// Reject a sort column outside the allow-list.
    pub fn check_sort_allowed(&self, allowed: &BTreeSet<String>) -> Result<(), ValidationError> {
        match &self.sort {
            Some(sort) if !allowed.contains(&sort.column) => Err(ValidationError::single(
                SORT_PARAMETER,
                format!("Sorting by {} is not allowed", sort.column),
            )),
            _ => Ok(()),
        }
    }

    /// The text substituted for `${pagination}`:
    /// `ORDER BY column direction LIMIT size OFFSET page*size`, without the
    /// ORDER BY when unsorted.
    pub fn pagination_clause(&self) -> Result<String, Error> {
        let limit = format!("LIMIT {} OFFSET {}", self.size, self.offset());
        match &self.sort {
            None => Ok(limit),
            Some(sort) => Ok(format!(
                "ORDER BY {} {} {limit}",
                column_for_key(&sort.column)?,
                sort.direction
            )),
        }
    }
}

/// One page of results, along with the number of rows across all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub total_count: u64,
}
