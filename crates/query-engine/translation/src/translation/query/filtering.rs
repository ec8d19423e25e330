//! Handle filtering/where clauses translation.

use query_engine_metadata::metadata::{AttributeType, FilterOperation};
use query_engine_sql::sql;

use super::helpers::{Env, State};
use super::relationships::translate_path;
use super::values::{coerce_raw, coerce_value};
use crate::translation::criteria::{CriteriaValue, SearchCriteria};
use crate::translation::error::Error;
use crate::translation::template::contains_pattern;
use crate::translation::values::split_list;

/// Translate all criteria into one expression, AND-ed in order.
/// No criteria translate to `true`.
pub fn translate_criteria(
    env: &Env,
    state: &mut State,
    criteria: &[SearchCriteria],
) -> Result<sql::ast::Expression, Error> {
    criteria
        .iter()
        .map(|criterion| translate_criterion(env, state, criterion))
        .try_fold(sql::helpers::true_expr(), |acc, expression| {
            Ok(sql::helpers::and(acc, expression?))
        })
}

/// Translate one criterion into a boolean expression over the column its key resolves to.
pub fn translate_criterion(
    env: &Env,
    state: &mut State,
    criterion: &SearchCriteria,
) -> Result<sql::ast::Expression, Error> {
    let path = env.resolve_path(&criterion.key)?;
    let attribute_type = path.attribute.r#type;
    check_supported(criterion, attribute_type)?;

    let target = translate_path(env, state, &path)?;

    let comparison = |operator| -> Result<sql::ast::Expression, Error> {
        Ok(sql::ast::Expression::BinaryOperation {
            left: Box::new(target.clone()),
            operator,
            right: Box::new(sql::ast::Expression::Value(single_value(
                criterion,
                attribute_type,
            )?)),
        })
    };

    match criterion.operation {
        FilterOperation::Equal => comparison(sql::ast::BinaryOperator::Equals),
        FilterOperation::NotEqual => comparison(sql::ast::BinaryOperator::NotEquals),
        FilterOperation::Greater => comparison(sql::ast::BinaryOperator::GreaterThan),
        FilterOperation::Less => comparison(sql::ast::BinaryOperator::LessThan),
        FilterOperation::GreaterOrEqual => {
            comparison(sql::ast::BinaryOperator::GreaterThanOrEqualTo)
        }
        FilterOperation::LessOrEqual => comparison(sql::ast::BinaryOperator::LessThanOrEqualTo),
        FilterOperation::Contains => {
            let text = match &criterion.value {
                CriteriaValue::Scalar(value) => value.to_string(),
                CriteriaValue::Delimited(raw) => raw.clone(),
                CriteriaValue::Range(..) => return Err(shape_error(criterion, "a single value")),
            };
            Ok(sql::ast::Expression::BinaryOperation {
                left: Box::new(target),
                operator: sql::ast::BinaryOperator::Like,
                right: Box::new(sql::ast::Expression::Value(sql::ast::Value::String(
                    contains_pattern(&text),
                ))),
            })
        }
        FilterOperation::In => {
            let items = match &criterion.value {
                CriteriaValue::Delimited(raw) => split_list(raw)
                    .map(|item| coerce_raw(&criterion.key, item, attribute_type))
                    .collect::<Result<Vec<_>, Error>>()?,
                CriteriaValue::Scalar(value) => {
                    vec![coerce_value(&criterion.key, value, attribute_type)?]
                }
                CriteriaValue::Range(..) => {
                    return Err(shape_error(criterion, "a list of values"))
                }
            };
            Ok(sql::ast::Expression::BinaryArrayOperation {
                left: Box::new(target),
                operator: sql::ast::BinaryArrayOperator::In,
                right: items.into_iter().map(sql::ast::Expression::Value).collect(),
            })
        }
        FilterOperation::Between => match &criterion.value {
            CriteriaValue::Range(low, high) => Ok(sql::ast::Expression::Between {
                expression: Box::new(target),
                low: Box::new(sql::ast::Expression::Value(coerce_value(
                    &criterion.key,
                    low,
                    attribute_type,
                )?)),
                high: Box::new(sql::ast::Expression::Value(coerce_value(
                    &criterion.key,
                    high,
                    attribute_type,
                )?)),
            }),
            _ => Err(shape_error(criterion, "a pair of bounds")),
        },
    }
}

/// Reject operations the attribute's type cannot take part in.
fn check_supported(criterion: &SearchCriteria, attribute_type: AttributeType) -> Result<(), Error> {
    let supported = match criterion.operation {
        FilterOperation::Contains => attribute_type == AttributeType::String,
        operation if operation.is_ordering() => attribute_type.is_orderable(),
        _ => attribute_type.is_comparable(),
    };
    if supported {
        Ok(())
    } else {
        Err(Error::UnsupportedOperation {
            key: criterion.key.clone(),
            operation: criterion.operation,
            attribute_type,
        })
    }
}

fn single_value(
    criterion: &SearchCriteria,
    attribute_type: AttributeType,
) -> Result<sql::ast::Value, Error> {
    match &criterion.value {
        CriteriaValue::Scalar(value) => coerce_value(&criterion.key, value, attribute_type),
        CriteriaValue::Delimited(raw) => coerce_raw(&criterion.key, raw, attribute_type),
        CriteriaValue::Range(..) => Err(shape_error(criterion, "a single value")),
    }
}

fn shape_error(criterion: &SearchCriteria, expected: &'static str) -> Error {
    Error::ValueShape {
        key: criterion.key.clone(),
        operation: criterion.operation,
        expected,
    }
}
