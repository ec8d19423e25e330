//! Translate raw request parameters into validated search criteria, using a filter set.

use query_engine_metadata::metadata::{
    FieldType, Filter, FilterOperation, FilterSet, RANGE_FROM_SUFFIX, RANGE_TO_SUFFIX,
};

use super::error::ValidationError;
use super::parameters::ParameterSource;
use super::values::{parse_list, parse_value, split_list, ScalarValue};

pub const REQUIRED_MESSAGE: &str = "This parameter is required.";

/// The value a criterion compares against.
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaValue {
    Scalar(ScalarValue),
    /// The comma-separated string of an IN filter, as supplied. Every item is
    /// known to parse as the filter's field type.
    Delimited(String),
    /// The lower and upper bound of a BETWEEN filter.
    Range(ScalarValue, ScalarValue),
}

/// One validated condition: a storage path, an operation and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub key: String,
    pub operation: FilterOperation,
    pub value: CriteriaValue,
    pub field_type: FieldType,
}

impl SearchCriteria {
    pub fn new(
        key: impl Into<String>,
        operation: FilterOperation,
        value: CriteriaValue,
        field_type: FieldType,
    ) -> Self {
        SearchCriteria {
            key: key.into(),
            operation,
            value,
            field_type,
        }
    }

    /// The individual items of an IN criterion, trimmed.
    pub fn items(&self) -> Vec<String> {
        match &self.value {
            CriteriaValue::Delimited(raw) => split_list(raw).map(str::to_string).collect(),
            CriteriaValue::Scalar(value) => vec![value.to_string()],
            CriteriaValue::Range(low, high) => vec![low.to_string(), high.to_string()],
        }
    }
}

/// Validate the parameters against every filter in the set.
///
/// Filters whose parameters are absent are skipped unless required. All
/// problems are collected, keyed by the parameter at fault, before failing.
/// For any type but STRING an empty value counts as absent.
pub fn translate<P>(parameters: &P, filter_set: &FilterSet) -> Result<Vec<SearchCriteria>, ValidationError>
where
    P: ParameterSource + ?Sized,
{
    let mut criteria = Vec::new();
    let mut errors = ValidationError::default();

    for filter in filter_set.iter() {
        match filter.operation {
            FilterOperation::Between => {
                criteria.extend(translate_range(parameters, filter, &mut errors));
            }
            FilterOperation::In => criteria.extend(translate_list(parameters, filter, &mut errors)),
            _ => criteria.extend(translate_scalar(parameters, filter, &mut errors)),
        }
    }

    if !errors.is_empty() {
        tracing::debug!(errors = ?errors.errors, "request parameters failed validation");
    }
    errors.into_result(criteria)
}

fn lookup<'a, P>(parameters: &'a P, name: &str, field_type: FieldType) -> Option<&'a str>
where
    P: ParameterSource + ?Sized,
{
    parameters
        .parameter(name)
        .filter(|value| field_type == FieldType::String || !value.trim().is_empty())
}

fn translate_scalar<P>(
    parameters: &P,
    filter: &Filter,
    errors: &mut ValidationError,
) -> Option<SearchCriteria>
where
    P: ParameterSource + ?Sized,
{
    let Some(raw) = lookup(parameters, &filter.name, filter.field_type) else {
        if filter.required {
            errors.insert(&filter.name, REQUIRED_MESSAGE);
        }
        return None;
    };
    match parse_value(filter.field_type, raw) {
        Ok(value) => Some(SearchCriteria::new(
            filter.storage_path(),
            filter.operation,
            CriteriaValue::Scalar(value),
            filter.field_type,
        )),
        Err(error) => {
            errors.insert(&filter.name, error.to_string());
            None
        }
    }
}

fn translate_list<P>(
    parameters: &P,
    filter: &Filter,
    errors: &mut ValidationError,
) -> Option<SearchCriteria>
where
    P: ParameterSource + ?Sized,
{
    let Some(raw) = lookup(parameters, &filter.name, filter.field_type) else {
        if filter.required {
            errors.insert(&filter.name, REQUIRED_MESSAGE);
        }
        return None;
    };
    match parse_list(filter.field_type, raw) {
        Ok(_) => Some(SearchCriteria::new(
            filter.storage_path(),
            filter.operation,
            CriteriaValue::Delimited(raw.to_string()),
            filter.field_type,
        )),
        Err(_) => {
            errors.insert(
                &filter.name,
                format!("{raw} is invalid value for type {}", filter.field_type),
            );
            None
        }
    }
}

/// A BETWEEN filter becomes a pair of inclusive bounds on the same path.
fn translate_range<P>(
    parameters: &P,
    filter: &Filter,
    errors: &mut ValidationError,
) -> Vec<SearchCriteria>
where
    P: ParameterSource + ?Sized,
{
    let from_name = format!("{}{RANGE_FROM_SUFFIX}", filter.name);
    let to_name = format!("{}{RANGE_TO_SUFFIX}", filter.name);

    match (
        lookup(parameters, &from_name, filter.field_type),
        lookup(parameters, &to_name, filter.field_type),
    ) {
        (None, None) => {
            if filter.required {
                errors.insert(&filter.name, REQUIRED_MESSAGE);
            }
            vec![]
        }
        (Some(_), None) => {
            errors.insert(&to_name, pairing_message(&from_name, &to_name));
            vec![]
        }
        (None, Some(_)) => {
            errors.insert(&from_name, pairing_message(&from_name, &to_name));
            vec![]
        }
        (Some(from), Some(to)) => {
            let low = parse_value(filter.field_type, from)
                .map_err(|error| errors.insert(&from_name, error.to_string()))
                .ok();
            let high = parse_value(filter.field_type, to)
                .map_err(|error| errors.insert(&to_name, error.to_string()))
                .ok();
            match (low, high) {
                (Some(low), Some(high)) => vec![
                    SearchCriteria::new(
                        filter.storage_path(),
                        FilterOperation::GreaterOrEqual,
                        CriteriaValue::Scalar(low),
                        filter.field_type,
                    ),
                    SearchCriteria::new(
                        filter.storage_path(),
                        FilterOperation::LessOrEqual,
                        CriteriaValue::Scalar(high),
                        filter.field_type,
                    ),
                ],
                _ => vec![],
            }
        }
    }
}

fn pairing_message(from_name: &str, to_name: &str) -> String {
    format!("Both {from_name} and {to_name} must be present.")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn parameters(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn absent_parameters_are_skipped() {
        let filter_set = FilterSet::builder()
            .add_filter("status", FilterOperation::Equal, FieldType::String)
            .add_filter("age", FilterOperation::Greater, FieldType::Integer)
            .build()
            .unwrap();

        let criteria = translate(&parameters(&[("status", "ACTIVE")]), &filter_set).unwrap();

        assert_eq!(
            criteria,
            vec![SearchCriteria::new(
                "status",
                FilterOperation::Equal,
                CriteriaValue::Scalar(ScalarValue::String("ACTIVE".to_string())),
                FieldType::String
            )]
        );
    }

    #[test]
    fn empty_string_counts_as_absent_except_for_strings() {
        let filter_set = FilterSet::builder()
            .add_filter("name", FilterOperation::Equal, FieldType::String)
            .add_filter("age", FilterOperation::Equal, FieldType::Integer)
            .build()
            .unwrap();

        let criteria = translate(&parameters(&[("name", ""), ("age", "")]), &filter_set).unwrap();

        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria[0].key, "name");
    }

    #[test]
    fn every_invalid_parameter_is_reported() {
        let filter_set = FilterSet::builder()
            .add_filter("age", FilterOperation::Equal, FieldType::Integer)
            .add_filter("active", FilterOperation::Equal, FieldType::Boolean)
            .build()
            .unwrap();

        let error = translate(
            &parameters(&[("age", "abc"), ("active", "maybe")]),
            &filter_set,
        )
        .unwrap_err();

        assert_eq!(
            error.errors,
            BTreeMap::from([
                (
                    "active".to_string(),
                    "maybe is invalid value for type BOOLEAN".to_string()
                ),
                (
                    "age".to_string(),
                    "abc is invalid value for type INTEGER".to_string()
                ),
            ])
        );
    }

    #[test]
    fn required_filter_must_be_present() {
        let filter_set = FilterSet::builder()
            .add(Filter::new("tenant", FilterOperation::Equal, FieldType::Long).required())
            .build()
            .unwrap();

        let error = translate(&parameters(&[]), &filter_set).unwrap_err();
        assert_eq!(error, ValidationError::single("tenant", REQUIRED_MESSAGE));
    }

    #[test]
    fn in_keeps_the_original_string() {
        let filter_set = FilterSet::builder()
            .add_filter("ids", FilterOperation::In, FieldType::Integer)
            .build()
            .unwrap();

        let criteria = translate(&parameters(&[("ids", "1, 2,3")]), &filter_set).unwrap();
        assert_eq!(
            criteria[0].value,
            CriteriaValue::Delimited("1, 2,3".to_string())
        );
        assert_eq!(criteria[0].items(), vec!["1", "2", "3"]);

        let error = translate(&parameters(&[("ids", "1,x")]), &filter_set).unwrap_err();
        assert_eq!(
            error,
            ValidationError::single("ids", "1,x is invalid value for type INTEGER")
        );
    }

    #[test]
    fn between_requires_both_bounds() {
        let filter_set = FilterSet::builder()
            .add_filter("age", FilterOperation::Between, FieldType::Integer)
            .build()
            .unwrap();

        let error = translate(&parameters(&[("ageFrom", "18")]), &filter_set).unwrap_err();
        assert_eq!(
            error,
            ValidationError::single("ageTo", "Both ageFrom and ageTo must be present.")
        );

        let error = translate(&parameters(&[("ageTo", "65")]), &filter_set).unwrap_err();
        assert_eq!(
            error,
            ValidationError::single("ageFrom", "Both ageFrom and ageTo must be present.")
        );
    }

    #[test]
    fn between_becomes_two_inclusive_bounds() {
        let filter_set = FilterSet::builder()
            .add_filter("age", FilterOperation::Between, FieldType::Integer)
            .build()
            .unwrap();

        let criteria = translate(
            &parameters(&[("ageFrom", "18"), ("ageTo", "65")]),
            &filter_set,
        )
        .unwrap();
        assert_eq!(
            criteria,
            vec![
                SearchCriteria::new(
                    "age",
                    FilterOperation::GreaterOrEqual,
                    CriteriaValue::Scalar(ScalarValue::Integer(18)),
                    FieldType::Integer
                ),
                SearchCriteria::new(
                    "age",
                    FilterOperation::LessOrEqual,
                    CriteriaValue::Scalar(ScalarValue::Integer(65)),
                    FieldType::Integer
                ),
            ]
        );
    }

    #[test]
    fn between_reports_the_failing_bound() {
        let filter_set = FilterSet::builder()
            .add_filter("age", FilterOperation::Between, FieldType::Integer)
            .build()
            .unwrap();

        let error = translate(
            &parameters(&[("ageFrom", "x"), ("ageTo", "65")]),
            &filter_set,
        )
        .unwrap_err();
        assert_eq!(
            error,
            ValidationError::single("ageFrom", "x is invalid value for type INTEGER")
        );
    }

    #[test]
    fn storage_path_becomes_the_key() {
        let filter_set = FilterSet::builder()
            .add_filter_for_path(
                "departmentName",
                "department__name",
                FilterOperation::Equal,
                FieldType::String,
            )
            .build()
            .unwrap();

        let pairs = vec![("departmentName".to_string(), "Sales".to_string())];
        let criteria = translate(&pairs, &filter_set).unwrap();
        assert_eq!(criteria[0].key, "department__name");
    }
}
