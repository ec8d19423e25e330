//! Metadata information regarding the database, the declared filters and the query templates.

pub mod entities;
pub mod filters;
pub mod paths;
pub mod templates;

// re-export without modules
pub use entities::*;
pub use filters::*;
pub use paths::*;
pub use templates::*;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata information.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub entities: EntityGraph,
    #[serde(default)]
    pub filter_sets: FilterSets,
    #[serde(default)]
    pub templates: TemplateQueries,
}

impl Metadata {
    pub fn empty() -> Self {
        Metadata {
            entities: EntityGraph::empty(),
            filter_sets: FilterSets::empty(),
            templates: TemplateQueries::empty(),
        }
    }
}
