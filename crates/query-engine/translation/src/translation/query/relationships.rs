//! Handle stuff related to relationships and joins.

use std::collections::BTreeMap;

use query_engine_metadata::metadata::ResolvedPath;
use query_engine_sql::sql;

use super::helpers::{Env, State};
use crate::translation::error::Error;

/// Join every relationship the path traverses, reusing joins already made for
/// the same path prefix, and return a reference to the attribute's column.
pub fn translate_path(
    env: &Env,
    state: &mut State,
    path: &ResolvedPath,
) -> Result<sql::ast::Expression, Error> {
    let mut current = state.root_alias().clone();

    for step in &path.steps {
        current = match state.join_alias(&step.prefix) {
            Some(alias) => alias.clone(),
            None => {
                let target = env.lookup_entity(&step.target_entity)?;
                let alias = state.make_table_alias(&step.relationship);
                let on = translate_column_mapping(&current, &alias, &step.column_mapping);
                state.add_join(
                    step.prefix.clone(),
                    sql::ast::LeftOuterJoin {
                        reference: sql::helpers::db_table(&target.schema_name, &target.table_name),
                        alias: alias.clone(),
                        on,
                    },
                );
                alias
            }
        };
    }

    Ok(sql::helpers::column(
        sql::ast::TableReference::AliasedTable(current),
        &path.attribute.column_name,
    ))
}

/// Given a relationship, turn its column mapping into the join's ON condition.
pub fn translate_column_mapping(
    source: &sql::ast::TableAlias,
    target: &sql::ast::TableAlias,
    column_mapping: &BTreeMap<String, String>,
) -> sql::ast::Expression {
    column_mapping
        .iter()
        .map(|(source_column, target_column)| {
            sql::helpers::equals(
                sql::helpers::column(
                    sql::ast::TableReference::AliasedTable(source.clone()),
                    source_column,
                ),
                sql::helpers::column(
                    sql::ast::TableReference::AliasedTable(target.clone()),
                    target_column,
                ),
            )
        })
        .fold(sql::helpers::true_expr(), sql::helpers::and)
}
