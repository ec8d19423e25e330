//! Sources of raw, string-valued request parameters.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use indexmap::IndexMap;

/// Anything that can look up a request parameter by name.
pub trait ParameterSource {
    fn parameter(&self, name: &str) -> Option<&str>;
}

impl ParameterSource for BTreeMap<String, String> {
    fn parameter(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<S: BuildHasher> ParameterSource for HashMap<String, String, S> {
    fn parameter(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<S: BuildHasher> ParameterSource for IndexMap<String, String, S> {
    fn parameter(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Query-string style pairs. The first occurrence of a name wins.
impl ParameterSource for [(String, String)] {
    fn parameter(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl ParameterSource for Vec<(String, String)> {
    fn parameter(&self, name: &str) -> Option<&str> {
        self.as_slice().parameter(name)
    }
}
