//! Handle the top level statements built around a predicate.

use query_engine_sql::sql;

use super::helpers::{Env, State};
use crate::translation::error::Error;

/// What the statement selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Every column of the root entity.
    Rows,
    /// `COUNT(*)`.
    Count,
}

/// Build `SELECT ... FROM root LEFT OUTER JOIN ... WHERE ... ORDER BY ... LIMIT ...`.
pub fn translate_select(
    env: &Env,
    state: State,
    projection: Projection,
    expression: sql::ast::Expression,
    order_by: sql::ast::OrderBy,
    limit: sql::ast::Limit,
) -> Result<sql::ast::Select, Error> {
    let root = env.lookup_entity(env.root_entity())?;
    let root_alias = state.root_alias().clone();

    let from = sql::ast::From::Table {
        reference: sql::helpers::db_table(&root.schema_name, &root.table_name),
        alias: root_alias.clone(),
    };

    let mut select = match projection {
        Projection::Rows => {
            let mut select = sql::helpers::star_select(from);
            select.select_list = sql::ast::SelectList::SelectStarFrom(
                sql::ast::TableReference::AliasedTable(root_alias),
            );
            select
        }
        Projection::Count => sql::helpers::count_select(from),
    };

    select.joins = state.into_joins();
    select.where_ = sql::ast::Where(expression);
    select.order_by = order_by;
    select.limit = limit;

    Ok(select)
}
