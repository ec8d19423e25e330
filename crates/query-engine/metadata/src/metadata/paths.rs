//! Resolution of storage paths such as `department__manager__name` into the
//! relationships they traverse and the attribute they end in.

use std::collections::BTreeMap;

use thiserror::Error;

use super::entities::{AttributeType, EntityGraph, EntityInfo, RelationshipKind};
use super::filters::{FilterSet, PATH_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("entity '{0}' not found")]
    EntityNotFound(String),
    #[error("attribute '{attribute}' not found on entity '{entity}'")]
    AttributeNotFound { entity: String, attribute: String },
    #[error("path '{path}' continues past attribute '{attribute}', which is not a relationship")]
    PathTraversesAttribute { path: String, attribute: String },
    #[error("path '{path}' ends in relationship '{relationship}' instead of an attribute")]
    PathEndsInRelationship { path: String, relationship: String },
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// One relationship traversed by a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    /// The path prefix up to and including this relationship, e.g.
    /// `department__manager`. Two paths sharing a prefix share the step.
    pub prefix: String,
    pub relationship: String,
    pub kind: RelationshipKind,
    pub source_entity: String,
    pub target_entity: String,
    /// Source column name to target column name.
    pub column_mapping: BTreeMap<String, String>,
}

/// The attribute a path ends in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub entity: String,
    pub name: String,
    pub column_name: String,
    pub r#type: AttributeType,
}

/// A storage path resolved against the entity graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub root_entity: String,
    pub steps: Vec<JoinStep>,
    pub attribute: ResolvedAttribute,
}

impl EntityGraph {
    pub fn lookup_entity(&self, name: &str) -> Result<&EntityInfo, PathError> {
        self.0
            .get(name)
            .ok_or_else(|| PathError::EntityNotFound(name.to_string()))
    }

    /// Walk `path` from `root_entity`. Every segment but the last must name a
    /// relationship; the last must name an attribute.
    pub fn resolve_path(&self, root_entity: &str, path: &str) -> Result<ResolvedPath, PathError> {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(PathError::EmptySegment(path.to_string()));
        }

        let mut current_name = root_entity.to_string();
        let mut current = self.lookup_entity(root_entity)?;
        let mut steps = Vec::new();

        let (last, intermediate) = segments
            .split_last()
            .ok_or_else(|| PathError::EmptySegment(path.to_string()))?;

        for (index, segment) in intermediate.iter().enumerate() {
            match current.relationships.get(*segment) {
                Some(relationship) => {
                    let target = self.lookup_entity(&relationship.target_entity)?;
                    steps.push(JoinStep {
                        prefix: segments[..=index].join(PATH_SEPARATOR),
                        relationship: (*segment).to_string(),
                        kind: relationship.kind,
                        source_entity: current_name.clone(),
                        target_entity: relationship.target_entity.clone(),
                        column_mapping: relationship.column_mapping.clone(),
                    });
                    current_name.clone_from(&relationship.target_entity);
                    current = target;
                }
                None if current.attributes.contains_key(*segment) => {
                    return Err(PathError::PathTraversesAttribute {
                        path: path.to_string(),
                        attribute: (*segment).to_string(),
                    })
                }
                None => {
                    return Err(PathError::AttributeNotFound {
                        entity: current_name,
                        attribute: (*segment).to_string(),
                    })
                }
            }
        }

        match current.attributes.get(*last) {
            Some(attribute) => Ok(ResolvedPath {
                root_entity: root_entity.to_string(),
                steps,
                attribute: ResolvedAttribute {
                    entity: current_name,
                    name: (*last).to_string(),
                    column_name: attribute.column_name.clone(),
                    r#type: attribute.r#type,
                },
            }),
            None if current.relationships.contains_key(*last) => {
                Err(PathError::PathEndsInRelationship {
                    path: path.to_string(),
                    relationship: (*last).to_string(),
                })
            }
            None => Err(PathError::AttributeNotFound {
                entity: current_name,
                attribute: (*last).to_string(),
            }),
        }
    }
}

/// Storage paths of one or more filter sets, resolved ahead of time against a
/// single root entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTable {
    root_entity: String,
    paths: BTreeMap<String, ResolvedPath>,
}

impl PathTable {
    pub fn new(root_entity: impl Into<String>) -> Self {
        PathTable {
            root_entity: root_entity.into(),
            paths: BTreeMap::new(),
        }
    }

    /// Resolve the storage path of every filter in the set.
    pub fn build(
        graph: &EntityGraph,
        root_entity: &str,
        filter_set: &FilterSet,
    ) -> Result<Self, PathError> {
        let mut table = PathTable::new(root_entity);
        table.extend(graph, filter_set)?;
        Ok(table)
    }

    pub fn extend(&mut self, graph: &EntityGraph, filter_set: &FilterSet) -> Result<(), PathError> {
        for filter in filter_set.iter() {
            self.insert(graph, filter.storage_path())?;
        }
        Ok(())
    }

    pub fn insert(&mut self, graph: &EntityGraph, path: &str) -> Result<(), PathError> {
        if !self.paths.contains_key(path) {
            let resolved = graph.resolve_path(&self.root_entity, path)?;
            self.paths.insert(path.to_string(), resolved);
        }
        Ok(())
    }

    pub fn root_entity(&self) -> &str {
        &self.root_entity
    }

    pub fn get(&self, path: &str) -> Option<&ResolvedPath> {
        self.paths.get(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
