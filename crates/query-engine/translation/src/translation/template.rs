//! Translate search criteria into the clauses substituted into a query template.
//!
//! A template is a SQL statement containing `${whereClause}` and, for paged
//! queries, `${pagination}`. Criteria keys name columns directly, with `__`
//! standing for `.` so that `d__name` addresses `d.name` of a joined table.

use query_engine_metadata::metadata::{FilterOperation, PATH_SEPARATOR};
use query_engine_sql::sql::string::{Param, ValueBinding, SQL};

use super::criteria::{CriteriaValue, SearchCriteria};
use super::error::Error;
use super::pagination::PageRequest;
use super::values::{parse_value, split_list, ScalarValue};

pub const WHERE_CLAUSE_PLACEHOLDER: &str = "${whereClause}";
pub const PAGINATION_PLACEHOLDER: &str = "${pagination}";

/// Turn a criteria key into a column reference, checking every segment is a
/// plain identifier.
pub fn column_for_key(key: &str) -> Result<String, Error> {
    let segments: Vec<&str> = key.split(PATH_SEPARATOR).collect();
    if segments.iter().all(|segment| is_identifier(segment)) {
        Ok(segments.join("."))
    } else {
        Err(Error::InvalidIdentifier(key.to_string()))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// `WHERE c1 op v1 AND c2 op v2 ...`, or nothing when there are no criteria.
pub fn translate_where_clause(
    criteria: &[SearchCriteria],
    binding: ValueBinding,
) -> Result<SQL, Error> {
    let mut sql = SQL::with_binding(binding);
    for (index, criterion) in criteria.iter().enumerate() {
        sql.append_syntax(if index == 0 { "WHERE " } else { " AND " });
        translate_criterion(&mut sql, criterion)?;
    }
    Ok(sql)
}

fn translate_criterion(sql: &mut SQL, criterion: &SearchCriteria) -> Result<(), Error> {
    let column = column_for_key(&criterion.key)?;
    sql.append_syntax(&column);
    match criterion.operation {
        FilterOperation::Equal => append_comparison(sql, " = ", criterion),
        FilterOperation::NotEqual => append_comparison(sql, " <> ", criterion),
        FilterOperation::Greater => append_comparison(sql, " > ", criterion),
        FilterOperation::Less => append_comparison(sql, " < ", criterion),
        FilterOperation::GreaterOrEqual => append_comparison(sql, " >= ", criterion),
        FilterOperation::LessOrEqual => append_comparison(sql, " <= ", criterion),
        FilterOperation::Contains => {
            let text = match &criterion.value {
                CriteriaValue::Scalar(value) => value.to_string(),
                CriteriaValue::Delimited(raw) => raw.clone(),
                CriteriaValue::Range(..) => return Err(shape_error(criterion, "a single value")),
            };
            sql.append_syntax(" LIKE ");
            sql.append_param(Param::String(contains_pattern(&text)));
            Ok(())
        }
        FilterOperation::In => {
            let items = list_values(criterion)?;
            sql.append_syntax(" IN (");
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    sql.append_syntax(", ");
                }
                sql.append_param(item.to_param());
            }
            sql.append_syntax(")");
            Ok(())
        }
        FilterOperation::Between => match &criterion.value {
            CriteriaValue::Range(low, high) => {
                sql.append_syntax(" BETWEEN ");
                sql.append_param(low.to_param());
                sql.append_syntax(" AND ");
                sql.append_param(high.to_param());
                Ok(())
            }
            _ => Err(shape_error(criterion, "a pair of bounds")),
        },
    }
}

fn append_comparison(sql: &mut SQL, operator: &str, criterion: &SearchCriteria) -> Result<(), Error> {
    let value = match &criterion.value {
        CriteriaValue::Scalar(value) => value.clone(),
        CriteriaValue::Delimited(raw) => parse_value(criterion.field_type, raw)
            .map_err(|_| shape_error(criterion, "a single value"))?,
        CriteriaValue::Range(..) => return Err(shape_error(criterion, "a single value")),
    };
    sql.append_syntax(operator);
    sql.append_param(value.to_param());
    Ok(())
}

fn list_values(criterion: &SearchCriteria) -> Result<Vec<ScalarValue>, Error> {
    match &criterion.value {
        CriteriaValue::Scalar(value) => Ok(vec![value.clone()]),
        CriteriaValue::Delimited(raw) => split_list(raw)
            .map(|item| {
                parse_value(criterion.field_type, item)
                    .map_err(|_| shape_error(criterion, "a list of values"))
            })
            .collect(),
        CriteriaValue::Range(..) => Err(shape_error(criterion, "a list of values")),
    }
}

fn shape_error(criterion: &SearchCriteria, expected: &'static str) -> Error {
    Error::ValueShape {
        key: criterion.key.clone(),
        operation: criterion.operation,
        expected,
    }
}

/// `%text%`, with LIKE wildcards and the escape character in `text` escaped.
pub fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Replace every occurrence of both placeholders.
pub fn substitute(template: &str, where_clause: &str, pagination: &str) -> String {
    if !where_clause.is_empty() && !template.contains(WHERE_CLAUSE_PLACEHOLDER) {
        tracing::warn!(
            template,
            "template has no {WHERE_CLAUSE_PLACEHOLDER} placeholder; criteria are ignored"
        );
    }
    template
        .replace(WHERE_CLAUSE_PLACEHOLDER, where_clause)
        .replace(PAGINATION_PLACEHOLDER, pagination)
}

/// The template with its WHERE clause and, when paged, its pagination clause.
pub fn translate_template_query(
    template: &str,
    criteria: &[SearchCriteria],
    page: Option<&PageRequest>,
    binding: ValueBinding,
) -> Result<SQL, Error> {
    let where_clause = translate_where_clause(criteria, binding)?;
    let pagination = match page {
        Some(page) => page.pagination_clause()?,
        None => String::new(),
    };
    Ok(SQL {
        sql: substitute(template, &where_clause.sql, &pagination),
        ..where_clause
    })
}

/// `SELECT COUNT(*) FROM (<template without pagination>) AS count_query`.
pub fn translate_count_query(
    template: &str,
    criteria: &[SearchCriteria],
    binding: ValueBinding,
) -> Result<SQL, Error> {
    let where_clause = translate_where_clause(criteria, binding)?;
    let inner = substitute(template, &where_clause.sql, "");
    Ok(SQL {
        sql: format!("SELECT COUNT(*) FROM ({inner}) AS count_query"),
        ..where_clause
    })
}

/// The paged statement and its count. Both carry the same parameters.
pub fn translate_template_pair(
    template: &str,
    criteria: &[SearchCriteria],
    page: &PageRequest,
    binding: ValueBinding,
) -> Result<(SQL, SQL), Error> {
    Ok((
        translate_template_query(template, criteria, Some(page), binding)?,
        translate_count_query(template, criteria, binding)?,
    ))
}
