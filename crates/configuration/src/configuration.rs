//! The configuration used to serve requests.

use std::collections::BTreeMap;

use query_engine_metadata::metadata;
use query_engine_sql::sql::string::ValueBinding;

use crate::values::{PaginationSettings, PoolSettings};

/// The 'Configuration' type collects all the information necessary to serve queries at runtime.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration': secrets are resolved, and the storage path of
/// every filter is resolved against the entity its filter set targets.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub metadata: metadata::Metadata,
    /// Resolved paths, keyed by root entity.
    pub path_tables: BTreeMap<String, metadata::PathTable>,
    pub pool_settings: PoolSettings,
    pub pagination: PaginationSettings,
    pub value_binding: ValueBinding,
    pub connection_uri: String,
}

impl Configuration {
    pub fn filter_set(&self, name: &str) -> Option<&metadata::FilterSetInfo> {
        self.metadata.filter_sets.0.get(name)
    }

    pub fn template(&self, name: &str) -> Option<&metadata::TemplateInfo> {
        self.metadata.templates.0.get(name)
    }

    pub fn path_table(&self, entity: &str) -> Option<&metadata::PathTable> {
        self.path_tables.get(entity)
    }
}
