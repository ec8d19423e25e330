//! Translate search criteria into SQL over an entity and the entities it relates to.

pub mod filtering;
pub mod helpers;
pub mod relationships;
pub mod root;
pub mod sorting;
pub mod values;

use query_engine_metadata::metadata::{EntityGraph, PathTable};
use query_engine_sql::sql;

use crate::translation::criteria::SearchCriteria;
use crate::translation::error::Error;
use crate::translation::pagination::PageRequest;
use helpers::{Env, State};
use root::Projection;

/// Rows fetched when at most one is expected, so that a second match can be detected.
pub const SINGLE_ROW_PROBE_LIMIT: u32 = 2;

/// The criteria of a request as a boolean expression, together with the
/// joins the expression relies on. Built once; then turned into a page
/// query, a count query or a single-row query.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    state: State,
    expression: sql::ast::Expression,
}

impl Predicate {
    pub fn expression(&self) -> &sql::ast::Expression {
        &self.expression
    }

    pub fn joins(&self) -> &[sql::ast::Join] {
        self.state.joins()
    }

    pub fn root_alias(&self) -> &sql::ast::TableAlias {
        self.state.root_alias()
    }
}

/// Builds predicates and the statements around them for one root entity.
pub struct PredicateBuilder<'a> {
    env: Env<'a>,
}

impl<'a> PredicateBuilder<'a> {
    pub fn new(graph: &'a EntityGraph, root_entity: &'a str) -> Self {
        PredicateBuilder {
            env: Env::new(graph, root_entity),
        }
    }

    #[must_use]
    pub fn with_path_table(self, path_table: &'a PathTable) -> Self {
        PredicateBuilder {
            env: self.env.with_path_table(path_table),
        }
    }

    /// AND together one expression per criterion. Relationship paths shared by
    /// several criteria are joined once.
    pub fn build_predicate(&self, criteria: &[SearchCriteria]) -> Result<Predicate, Error> {
        self.env.lookup_entity(self.env.root_entity())?;
        let mut state = State::new(self.env.root_entity());
        let expression = filtering::translate_criteria(&self.env, &mut state, criteria)?;
        Ok(Predicate { state, expression })
    }

    /// One page of root rows, sorted as requested.
    pub fn page_query(
        &self,
        predicate: Predicate,
        page: &PageRequest,
    ) -> Result<sql::ast::Select, Error> {
        let Predicate {
            mut state,
            expression,
        } = predicate;
        let order_by = sorting::translate_order_by(&self.env, &mut state, page.sort.as_ref())?;
        root::translate_select(
            &self.env,
            state,
            Projection::Rows,
            expression,
            order_by,
            page.limit(),
        )
    }

    /// The number of rows matching the predicate.
    pub fn count_query(&self, predicate: &Predicate) -> Result<sql::ast::Select, Error> {
        root::translate_select(
            &self.env,
            predicate.state.clone(),
            Projection::Count,
            predicate.expression.clone(),
            sql::helpers::empty_order_by(),
            sql::helpers::empty_limit(),
        )
    }

    /// Up to two rows; more than one match is an error for the caller to raise.
    pub fn single_row_query(&self, predicate: Predicate) -> Result<sql::ast::Select, Error> {
        let Predicate { state, expression } = predicate;
        root::translate_select(
            &self.env,
            state,
            Projection::Rows,
            expression,
            sql::helpers::empty_order_by(),
            sql::ast::Limit {
                limit: Some(SINGLE_ROW_PROBE_LIMIT),
                offset: None,
            },
        )
    }
}
