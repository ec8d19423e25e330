//! The entities and filter sets of the sample configuration, for tests that do
//! not go through configuration parsing.

use std::collections::BTreeMap;

use query_engine_metadata::metadata::{EntityGraph, FilterSet, FilterSetInfo, Metadata};

const SAMPLE_CONFIGURATION_JSON: &str =
    include_str!("../static/sample-configuration/configuration.json");

/// The metadata of the sample configuration. Template files are not read.
pub fn sample_metadata() -> Metadata {
    serde_json::from_str(SAMPLE_CONFIGURATION_JSON).expect("sample configuration is valid")
}

/// company <- department <- employee, with `employee` as the usual root.
pub fn employee_graph() -> EntityGraph {
    sample_metadata().entities
}

pub fn filter_set_info(name: &str) -> FilterSetInfo {
    sample_metadata()
        .filter_sets
        .0
        .remove(name)
        .unwrap_or_else(|| panic!("no filter set named {name}"))
}

/// The filters of the `employees` filter set, rooted at `employee`.
pub fn employee_filters() -> FilterSet {
    filter_set_info("employees").filters
}

/// The filters of the `departmentEmployees` filter set, used by the templates.
pub fn department_employee_filters() -> FilterSet {
    filter_set_info("departmentEmployees").filters
}

/// Raw request parameters.
pub fn params<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
