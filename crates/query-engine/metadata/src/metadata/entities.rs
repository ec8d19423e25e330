//! Metadata information regarding the entities (tables) that can be queried,
//! their attributes and the relationships between them.

use std::collections::BTreeMap;
use std::fmt;

use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The storage types of entity attributes.
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
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    String,
    Date,
    DateTime,
    Timestamp,
    Json,
}

impl AttributeType {
    pub fn name(self) -> &'static str {
        match self {
            AttributeType::Integer => "integer",
            AttributeType::Long => "long",
            AttributeType::Float => "float",
            AttributeType::Double => "double",
            AttributeType::Boolean => "boolean",
            AttributeType::String => "string",
            AttributeType::Date => "date",
            AttributeType::DateTime => "dateTime",
            AttributeType::Timestamp => "timestamp",
            AttributeType::Json => "json",
        }
    }

    /// Can values of this type be compared with `=` and `<>`?
    pub fn is_comparable(self) -> bool {
        self != AttributeType::Json
    }

    /// Can values of this type be compared with `<`, `>` and BETWEEN?
    pub fn is_orderable(self) -> bool {
        !matches!(self, AttributeType::Json | AttributeType::Boolean)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mapping from an entity name to its information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct EntityGraph(pub BTreeMap<String, EntityInfo>);

impl EntityGraph {
    pub fn empty() -> Self {
        EntityGraph(BTreeMap::new())
    }
}

/// Information about an entity, backed by a database table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityInfo {
    pub schema_name: String,
    pub table_name: String,
    pub attributes: BTreeMap<String, AttributeInfo>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipInfo>,
}

/// Can this attribute contain null values
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Nullable {
    #[default]
    Nullable,
    NonNullable,
}

/// Information about an entity attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributeInfo {
    pub column_name: String,
    pub r#type: AttributeType,
    #[serde(default)]
    pub nullable: Nullable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    ToOne,
    ToMany,
}

/// A navigable association from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipInfo {
    pub target_entity: String,
    pub kind: RelationshipKind,
    /// Source column name to target column name.
    pub column_mapping: BTreeMap<String, String>,
}
