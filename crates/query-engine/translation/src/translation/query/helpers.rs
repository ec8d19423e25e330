//! Helpers for processing search criteria and building SQL.

use std::borrow::Cow;
use std::collections::BTreeMap;

use query_engine_metadata::metadata::{EntityGraph, EntityInfo, PathTable, ResolvedPath};
use query_engine_sql::sql;

use crate::translation::error::Error;

/// Static information from the entity graph and the root entity of the query.
pub struct Env<'a> {
    graph: &'a EntityGraph,
    root_entity: &'a str,
    path_table: Option<&'a PathTable>,
}

impl<'a> Env<'a> {
    pub fn new(graph: &'a EntityGraph, root_entity: &'a str) -> Self {
        Env {
            graph,
            root_entity,
            path_table: None,
        }
    }

    /// Use paths resolved ahead of time instead of walking the graph per request.
    /// The table is ignored unless it was built for the same root entity.
    #[must_use]
    pub fn with_path_table(mut self, path_table: &'a PathTable) -> Self {
        if path_table.root_entity() == self.root_entity {
            self.path_table = Some(path_table);
        }
        self
    }

    pub fn root_entity(&self) -> &'a str {
        self.root_entity
    }

    pub fn lookup_entity(&self, name: &str) -> Result<&'a EntityInfo, Error> {
        Ok(self.graph.lookup_entity(name)?)
    }

    pub fn resolve_path(&self, path: &str) -> Result<Cow<'a, ResolvedPath>, Error> {
        match self.path_table.and_then(|table| table.get(path)) {
            Some(resolved) => Ok(Cow::Borrowed(resolved)),
            None => Ok(Cow::Owned(
                self.graph.resolve_path(self.root_entity, path)?,
            )),
        }
    }
}

/// Mutable state while building one statement: table aliases handed out so
/// far and the joins already added, keyed by the path prefix they serve.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    next_index: u64,
    root_alias: sql::ast::TableAlias,
    joins: Vec<sql::ast::Join>,
    join_aliases: BTreeMap<String, sql::ast::TableAlias>,
}

impl State {
    pub fn new(root_entity: &str) -> State {
        State {
            next_index: 1,
            root_alias: sql::helpers::make_table_alias(0, root_entity),
            joins: vec![],
            join_aliases: BTreeMap::new(),
        }
    }

    pub fn root_alias(&self) -> &sql::ast::TableAlias {
        &self.root_alias
    }

    /// Create a table alias with a fresh unique index.
    pub fn make_table_alias(&mut self, name: &str) -> sql::ast::TableAlias {
        let alias = sql::helpers::make_table_alias(self.next_index, name);
        self.next_index += 1;
        alias
    }

    pub fn join_alias(&self, prefix: &str) -> Option<&sql::ast::TableAlias> {
        self.join_aliases.get(prefix)
    }

    pub fn add_join(&mut self, prefix: String, join: sql::ast::LeftOuterJoin) {
        self.join_aliases.insert(prefix, join.alias.clone());
        self.joins.push(sql::ast::Join::LeftOuterJoin(join));
    }

    pub fn joins(&self) -> &[sql::ast::Join] {
        &self.joins
    }

    pub fn into_joins(self) -> Vec<sql::ast::Join> {
        self.joins
    }
}
