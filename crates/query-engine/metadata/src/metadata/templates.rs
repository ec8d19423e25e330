//! Metadata information regarding query templates: SQL statements carrying the
//! `${whereClause}` and `${pagination}` placeholders.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mapping from a template name to its information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TemplateQueries(pub BTreeMap<String, TemplateInfo>);

impl TemplateQueries {
    pub fn empty() -> Self {
        TemplateQueries(BTreeMap::new())
    }
}

/// Information about a query template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub sql: TemplateSql,
    /// The filter set whose filters apply to this template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Template SQL, either written inline or read from a file next to the
/// configuration. After deserializing, file references are unresolved until
/// `resolve` reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TemplateSqlExternal", into = "TemplateSqlExternal")]
pub enum TemplateSql {
    Inline { sql: String },
    FromFile { file: PathBuf, sql: Option<String> },
}

impl TemplateSql {
    /// The statement text. Fails for a file that was never read.
    pub fn sql(&self) -> Result<&str, String> {
        match self {
            TemplateSql::Inline { sql }
            | TemplateSql::FromFile {
                sql: Some(sql), ..
            } => Ok(sql),
            TemplateSql::FromFile { file, sql: None } => Err(format!(
                "template file {} was not read during parsing",
                file.display()
            )),
        }
    }

    /// Read a file reference relative to the configuration directory.
    pub fn resolve(&mut self, configuration_directory: &Path) -> Result<(), String> {
        if let TemplateSql::FromFile { file, sql } = self {
            if sql.is_none() {
                let contents = fs::read_to_string(configuration_directory.join(&*file))
                    .map_err(|err| format!("{}: {}", file.display(), err))?;
                *sql = Some(contents);
            }
        }
        Ok(())
    }
}

// The on-disk form of template SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
enum TemplateSqlExternal {
    /// Relative path to a sql file.
    File { file: PathBuf },
    /// An inline SQL string.
    Inline(String),
}

impl From<TemplateSqlExternal> for TemplateSql {
    fn from(value: TemplateSqlExternal) -> Self {
        match value {
            TemplateSqlExternal::File { file } => TemplateSql::FromFile { file, sql: None },
            TemplateSqlExternal::Inline(sql) => TemplateSql::Inline { sql },
        }
    }
}

impl From<TemplateSql> for TemplateSqlExternal {
    fn from(value: TemplateSql) -> Self {
        match value {
            TemplateSql::Inline { sql } => TemplateSqlExternal::Inline(sql),
            TemplateSql::FromFile { file, .. } => TemplateSqlExternal::File { file },
        }
    }
}

impl JsonSchema for TemplateSql {
    fn schema_name() -> String {
        "TemplateSql".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        TemplateSqlExternal::json_schema(gen)
    }
}
