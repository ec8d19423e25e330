//! The filter catalog: named, typed and operator-bound descriptions of the
//! parameters a caller may use to narrow a query.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use enum_iterator::Sequence;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separates the segments of a storage path, e.g. `department__manager__name`.
pub const PATH_SEPARATOR: &str = "__";

/// Suffix of the parameter holding the lower bound of a BETWEEN filter.
pub const RANGE_FROM_SUFFIX: &str = "From";

/// Suffix of the parameter holding the upper bound of a BETWEEN filter.
pub const RANGE_TO_SUFFIX: &str = "To";

/// The types a filter parameter can be parsed into.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Sequence,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Integer,
    String,
    Float,
    Double,
    Long,
    Boolean,
    DateTime,
    Timestamp,
}

impl FieldType {
    /// The name used in messages and in the configuration file.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::String => "STRING",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Long => "LONG",
            FieldType::Boolean => "BOOLEAN",
            FieldType::DateTime => "DATE_TIME",
            FieldType::Timestamp => "TIMESTAMP",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The comparison a filter performs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Sequence,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperation {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
    In,
    Between,
}

impl FilterOperation {
    pub fn name(self) -> &'static str {
        match self {
            FilterOperation::Equal => "EQUAL",
            FilterOperation::NotEqual => "NOT_EQUAL",
            FilterOperation::Greater => "GREATER",
            FilterOperation::Less => "LESS",
            FilterOperation::GreaterOrEqual => "GREATER_OR_EQUAL",
            FilterOperation::LessOrEqual => "LESS_OR_EQUAL",
            FilterOperation::Contains => "CONTAINS",
            FilterOperation::In => "IN",
            FilterOperation::Between => "BETWEEN",
        }
    }

    /// Does this operation compare by ordering rather than equality?
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            FilterOperation::Greater
                | FilterOperation::Less
                | FilterOperation::GreaterOrEqual
                | FilterOperation::LessOrEqual
                | FilterOperation::Between
        )
    }
}

impl fmt::Display for FilterOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared, queryable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    /// The public parameter name.
    pub name: String,
    /// Where the value lives: a column name, or a `__`-separated path through
    /// relationships ending in an attribute. Defaults to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    pub operation: FilterOperation,
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    /// Reject requests that do not supply this filter.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

impl Filter {
    pub fn new(name: impl Into<String>, operation: FilterOperation, field_type: FieldType) -> Self {
        Filter {
            name: name.into(),
            storage_path: None,
            operation,
            field_type,
            help_text: None,
            required: false,
        }
    }

    #[must_use]
    pub fn with_storage_path(mut self, storage_path: impl Into<String>) -> Self {
        self.storage_path = Some(storage_path.into());
        self
    }

    #[must_use]
    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The storage path, falling back to the filter name.
    pub fn storage_path(&self) -> &str {
        self.storage_path.as_deref().unwrap_or(&self.name)
    }

    /// The request parameters this filter reads.
    /// A BETWEEN filter reads `{name}From` and `{name}To`; every other filter reads `{name}`.
    pub fn parameter_names(&self) -> Vec<String> {
        match self.operation {
            FilterOperation::Between => vec![
                format!("{}{RANGE_FROM_SUFFIX}", self.name),
                format!("{}{RANGE_TO_SUFFIX}", self.name),
            ],
            _ => vec![self.name.clone()],
        }
    }
}

/// Two filters in one set share a name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("filter '{0}' is declared more than once")]
pub struct DuplicateFilterError(pub String);

/// An immutable collection of filters, keyed by unique name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Filter>", into = "Vec<Filter>")]
pub struct FilterSet {
    filters: BTreeMap<String, Filter>,
}

impl FilterSet {
    pub fn builder() -> FilterSetBuilder {
        FilterSetBuilder::default()
    }

    pub fn empty() -> Self {
        FilterSet::default()
    }

    /// Filters in ascending order of name.
    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.values()
    }

    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.filters.get(name)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl TryFrom<Vec<Filter>> for FilterSet {
    type Error = DuplicateFilterError;

    fn try_from(filters: Vec<Filter>) -> Result<Self, Self::Error> {
        let mut by_name = BTreeMap::new();
        for filter in filters {
            if by_name.contains_key(&filter.name) {
                return Err(DuplicateFilterError(filter.name));
            }
            by_name.insert(filter.name.clone(), filter);
        }
        Ok(FilterSet { filters: by_name })
    }
}

impl From<FilterSet> for Vec<Filter> {
    fn from(value: FilterSet) -> Self {
        value.filters.into_values().collect()
    }
}

impl JsonSchema for FilterSet {
    fn schema_name() -> String {
        "FilterSet".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <Vec<Filter>>::json_schema(gen)
    }
}

/// Accumulates filter declarations. Nothing is checked until `build`.
#[derive(Debug, Clone, Default)]
pub struct FilterSetBuilder {
    filters: Vec<Filter>,
}

impl FilterSetBuilder {
    #[must_use]
    pub fn add(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn add_filter(
        self,
        name: impl Into<String>,
        operation: FilterOperation,
        field_type: FieldType,
    ) -> Self {
        self.add(Filter::new(name, operation, field_type))
    }

    #[must_use]
    pub fn add_filter_with_help(
        self,
        name: impl Into<String>,
        operation: FilterOperation,
        field_type: FieldType,
        help_text: impl Into<String>,
    ) -> Self {
        self.add(Filter::new(name, operation, field_type).with_help_text(help_text))
    }

    #[must_use]
    pub fn add_filter_for_path(
        self,
        name: impl Into<String>,
        storage_path: impl Into<String>,
        operation: FilterOperation,
        field_type: FieldType,
    ) -> Self {
        self.add(Filter::new(name, operation, field_type).with_storage_path(storage_path))
    }

    #[must_use]
    pub fn add_filter_for_path_with_help(
        self,
        name: impl Into<String>,
        storage_path: impl Into<String>,
        operation: FilterOperation,
        field_type: FieldType,
        help_text: impl Into<String>,
    ) -> Self {
        self.add(
            Filter::new(name, operation, field_type)
                .with_storage_path(storage_path)
                .with_help_text(help_text),
        )
    }

    pub fn build(self) -> Result<FilterSet, DuplicateFilterError> {
        FilterSet::try_from(self.filters)
    }
}

/// A filter set as declared in the configuration, together with the entity it
/// targets when used without a template and the columns callers may sort by.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterSetInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub allowed_order_by: BTreeSet<String>,
    pub filters: FilterSet,
}

/// Mapping from a filter set name to its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FilterSets(pub BTreeMap<String, FilterSetInfo>);

impl FilterSets {
    pub fn empty() -> Self {
        FilterSets(BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_are_iterated_in_name_order() {
        let filter_set = FilterSet::builder()
            .add_filter("status", FilterOperation::Equal, FieldType::String)
            .add_filter("age", FilterOperation::Greater, FieldType::Integer)
            .add_filter_for_path(
                "departmentName",
                "department__name",
                FilterOperation::Equal,
                FieldType::String,
            )
            .build()
            .unwrap();

        let names: Vec<&str> = filter_set.iter().map(|f| f.name.as_str()).collect();
        similar_asserts::assert_eq!(names, vec!["age", "departmentName", "status"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = FilterSet::builder()
            .add_filter("status", FilterOperation::Equal, FieldType::String)
            .add_filter("status", FilterOperation::In, FieldType::String)
            .build();

        assert_eq!(result, Err(DuplicateFilterError("status".to_string())));
    }

    #[test]
    fn storage_path_defaults_to_name() {
        let plain = Filter::new("age", FilterOperation::Equal, FieldType::Integer);
        let nested = plain.clone().with_storage_path("person__age");

        assert_eq!(plain.storage_path(), "age");
        assert_eq!(nested.storage_path(), "person__age");
    }

    #[test]
    fn between_reads_two_parameters() {
        let between = Filter::new("createdAt", FilterOperation::Between, FieldType::DateTime);
        let equal = Filter::new("createdAt", FilterOperation::Equal, FieldType::DateTime);

        assert_eq!(
            between.parameter_names(),
            vec!["createdAtFrom".to_string(), "createdAtTo".to_string()]
        );
        assert_eq!(equal.parameter_names(), vec!["createdAt".to_string()]);
    }

    #[test]
    fn names_match_serialized_form() {
        for field_type in enum_iterator::all::<FieldType>() {
            assert_eq!(
                serde_json::to_value(field_type).unwrap(),
                serde_json::Value::String(field_type.name().to_string())
            );
        }
        for operation in enum_iterator::all::<FilterOperation>() {
            assert_eq!(
                serde_json::to_value(operation).unwrap(),
                serde_json::Value::String(operation.name().to_string())
            );
        }
    }

    #[test]
    fn comparison_operations_use_their_configuration_names() {
        let operations: Vec<FilterOperation> = serde_json::from_value(serde_json::json!([
            "GREATER",
            "GREATER_OR_EQUAL",
            "LESS",
            "LESS_OR_EQUAL"
        ]))
        .unwrap();
        assert_eq!(
            operations,
            vec![
                FilterOperation::Greater,
                FilterOperation::GreaterOrEqual,
                FilterOperation::Less,
                FilterOperation::LessOrEqual,
            ]
        );
        assert!(operations.iter().all(|operation| operation.is_ordering()));

        assert!(serde_json::from_value::<FilterOperation>(serde_json::json!("GREATER_THAN")).is_err());
    }

    #[test]
    fn duplicate_names_are_rejected_when_deserializing() {
        let json = serde_json::json!([
            { "name": "age", "operation": "EQUAL", "fieldType": "INTEGER" },
            { "name": "age", "operation": "GREATER", "fieldType": "INTEGER" }
        ]);

        let error = serde_json::from_value::<FilterSet>(json).unwrap_err();
        assert!(error.to_string().contains("'age'"), "{error}");
    }
}
