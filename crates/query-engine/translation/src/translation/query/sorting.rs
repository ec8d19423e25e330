use query_engine_sql::sql;

use super::helpers::{Env, State};
use super::relationships::translate_path;
use crate::translation::error::Error;
use crate::translation::pagination::SortOrder;

/// Convert the sort order of a page request to a SQL ORDER BY clause, joining
/// any relationship the sort path traverses.
pub fn translate_order_by(
    env: &Env,
    state: &mut State,
    sort: Option<&SortOrder>,
) -> Result<sql::ast::OrderBy, Error> {
    match sort {
        None => Ok(sql::helpers::empty_order_by()),
        Some(sort) => {
            let path = env.resolve_path(&sort.column)?;
            let target = translate_path(env, state, &path)?;
            Ok(sql::ast::OrderBy {
                elements: vec![sql::ast::OrderByElement {
                    target,
                    direction: sort.direction.to_sql(),
                }],
            })
        }
    }
}
