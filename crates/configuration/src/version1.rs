//! Version 1 of the on-disk configuration format.

use std::path::Path;

use query_engine_metadata::metadata;
use query_engine_sql::sql::string::ValueBinding;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};
use crate::to_runtime_configuration::validate_metadata;
use crate::values::{ConnectionUri, PaginationSettings, PoolSettings, Secret};

pub const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const DEFAULT_CONNECTION_URI_VARIABLE: &str = "FILTER_QUERY_DATABASE_URL";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";

/// The configuration as written on disk: how to reach the database, the
/// entities it holds, the filter sets requests are checked against and the
/// query templates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    // Which version of the configuration format are we using
    pub version: u32,
    // Connection string for a Postgres-compatible database
    pub connection_uri: ConnectionUri,
    #[serde(skip_serializing_if = "PoolSettings::is_default")]
    #[serde(default)]
    pub pool_settings: PoolSettings,
    #[serde(skip_serializing_if = "PaginationSettings::is_default")]
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(skip_serializing_if = "is_default_binding")]
    #[serde(default)]
    pub value_binding: ValueBinding,
    #[serde(flatten)]
    pub metadata: metadata::Metadata,
}

fn is_default_binding(binding: &ValueBinding) -> bool {
    *binding == ValueBinding::default()
}

impl ParsedConfiguration {
    pub fn initial() -> Self {
        ParsedConfiguration::empty()
    }

    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            connection_uri: ConnectionUri(Secret::FromEnvironment {
                variable: DEFAULT_CONNECTION_URI_VARIABLE.into(),
            }),
            pool_settings: PoolSettings::default(),
            pagination: PaginationSettings::default(),
            value_binding: ValueBinding::default(),
            metadata: metadata::Metadata::empty(),
        }
    }
}

/// Parse the configuration directory: read `configuration.json`, read every
/// template stored in its own file, and check that the metadata fits together.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    let configuration_file_contents =
        fs::read_to_string(&configuration_file)
            .await
            .map_err(|err| {
                ParseConfigurationError::IoErrorButStringified(format!(
                    "{}: {}",
                    &configuration_file.display(),
                    err
                ))
            })?;

    let mut parsed_config: ParsedConfiguration = serde_json::from_str(&configuration_file_contents)
        .map_err(|error| ParseConfigurationError::ParseError {
            file_path: configuration_file.clone(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;

    if parsed_config.version != CURRENT_VERSION {
        return Err(ParseConfigurationError::UnsupportedVersion {
            found: parsed_config.version,
            expected: CURRENT_VERSION,
        });
    }

    // look for template sql file references and read from disk.
    for template in parsed_config.metadata.templates.0.values_mut() {
        template
            .sql
            .resolve(configuration_dir.as_ref())
            .map_err(ParseConfigurationError::IoErrorButStringified)?;
    }

    let path_tables = validate_metadata(&parsed_config.metadata)?;

    tracing::debug!(
        entities = parsed_config.metadata.entities.0.len(),
        filter_sets = parsed_config.metadata.filter_sets.0.len(),
        templates = parsed_config.metadata.templates.0.len(),
        resolved_paths = path_tables.values().map(metadata::PathTable::len).sum::<usize>(),
        "parsed configuration"
    );

    Ok(parsed_config)
}

/// Write the parsed configuration into a directory on disk, along with the
/// template files it refers to and a JSON schema of the format.
pub async fn write_parsed_configuration(
    parsed_config: ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().to_owned().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref()).await?;

    // create the configuration file
    fs::write(
        configuration_file,
        serde_json::to_string_pretty(&parsed_config)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )
    .await?;

    // look for template sql file references and write them to disk.
    for template in parsed_config.metadata.templates.0.values() {
        if let metadata::TemplateSql::FromFile {
            file,
            sql: Some(sql),
        } = &template.sql
        {
            if file.is_absolute() || file.starts_with("..") {
                Err(
                    WriteParsedConfigurationError::WritingOutsideDestinationDir {
                        dir: out_dir.as_ref().to_owned(),
                        file: file.clone(),
                    },
                )?;
            };

            let template_file = out_dir.as_ref().to_owned().join(file);
            if let Some(template_dir) = template_file.parent() {
                fs::create_dir_all(template_dir).await?;
            };
            fs::write(template_file, sql).await?;
        };
    }

    // create the jsonschema file
    let configuration_jsonschema_file_path = out_dir
        .as_ref()
        .to_owned()
        .join(CONFIGURATION_JSONSCHEMA_FILENAME);

    let output = schemars::schema_for!(ParsedConfiguration);
    fs::write(
        &configuration_jsonschema_file_path,
        serde_json::to_string_pretty(&output)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )
    .await?;

    Ok(())
}
