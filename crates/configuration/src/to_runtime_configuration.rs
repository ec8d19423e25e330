//! Convert a parsed configuration into the configuration used at runtime.

use std::collections::BTreeMap;

use query_engine_metadata::metadata;

use crate::configuration::Configuration;
use crate::environment::Environment;
use crate::error::{MakeRuntimeConfigurationError, MetadataError};
use crate::values::{ConnectionUri, Secret};
use crate::version1::ParsedConfiguration;

/// Resolve the connection uri from the environment and every filter path
/// against the entity graph.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let connection_uri = match parsed_config.connection_uri {
        ConnectionUri(Secret::Plain(uri)) => uri,
        ConnectionUri(Secret::FromEnvironment { variable }) => environment.read(&variable)?,
    };
    let path_tables = validate_metadata(&parsed_config.metadata)?;

    Ok(Configuration {
        metadata: parsed_config.metadata,
        path_tables,
        pool_settings: parsed_config.pool_settings,
        pagination: parsed_config.pagination,
        value_binding: parsed_config.value_binding,
        connection_uri,
    })
}

/// Check that the metadata fits together, returning the resolved paths of
/// every filter set that targets an entity, keyed by entity.
///
/// Filter sets used only by templates name columns of the template's result
/// and are not resolved.
pub fn validate_metadata(
    metadata: &metadata::Metadata,
) -> Result<BTreeMap<String, metadata::PathTable>, MetadataError> {
    let graph = &metadata.entities;
    let mut path_tables = BTreeMap::<String, metadata::PathTable>::new();

    for (name, filter_set) in &metadata.filter_sets.0 {
        let Some(entity) = &filter_set.entity else {
            continue;
        };
        let path_error = |source| MetadataError::FilterPath {
            filter_set: name.clone(),
            source,
        };
        graph.lookup_entity(entity).map_err(path_error)?;

        let table = path_tables
            .entry(entity.clone())
            .or_insert_with(|| metadata::PathTable::new(entity.clone()));
        table.extend(graph, &filter_set.filters).map_err(path_error)?;
        for path in &filter_set.allowed_order_by {
            table
                .insert(graph, path)
                .map_err(|source| MetadataError::OrderByPath {
                    filter_set: name.clone(),
                    path: path.clone(),
                    source,
                })?;
        }
    }

    for (name, template) in &metadata.templates.0 {
        template
            .sql
            .sql()
            .map_err(|message| MetadataError::UnresolvedTemplate {
                template: name.clone(),
                message,
            })?;
        if let Some(filter_set) = &template.filter_set {
            if !metadata.filter_sets.0.contains_key(filter_set) {
                return Err(MetadataError::UnknownFilterSet {
                    template: name.clone(),
                    filter_set: filter_set.clone(),
                });
            }
        }
    }

    Ok(path_tables)
}
