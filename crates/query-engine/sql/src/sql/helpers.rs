//! Helpers for building sql::ast types in certain shapes and patterns.

use super::ast::*;

// Empty clauses //

/// An empty `WHERE` clause.
pub fn empty_where() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// An empty `ORDER BY` clause.
pub fn empty_order_by() -> OrderBy {
    OrderBy { elements: vec![] }
}

/// Empty `LIMIT` and `OFFSET` clauses.
pub fn empty_limit() -> Limit {
    Limit {
        limit: None,
        offset: None,
    }
}

/// A `LIMIT` of `size` rows starting at row `offset`.
pub fn page_limit(size: u32, offset: u64) -> Limit {
    Limit {
        limit: Some(size),
        offset: Some(offset),
    }
}

/// A `true` expression.
pub fn true_expr() -> Expression {
    Expression::Value(Value::Bool(true))
}

// Expressions //

/// Conjunction of two expressions, dropping `true` operands.
pub fn and(left: Expression, right: Expression) -> Expression {
    if left == true_expr() {
        right
    } else if right == true_expr() {
        left
    } else {
        Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

pub fn equals(left: Expression, right: Expression) -> Expression {
    Expression::BinaryOperation {
        left: Box::new(left),
        operator: BinaryOperator::Equals,
        right: Box::new(right),
    }
}

// Aliasing //

/// Create table aliases using this function so they get a unique index.
pub fn make_table_alias(unique_index: u64, name: &str) -> TableAlias {
    TableAlias {
        unique_index,
        name: name.to_string(),
    }
}

/// Create column aliases using this function so we build everything in one place.
pub fn make_column_alias(name: String) -> ColumnAlias {
    ColumnAlias { name }
}

pub fn db_table(schema: &str, table: &str) -> TableReference {
    TableReference::DBTable {
        schema: SchemaName(schema.to_string()),
        table: TableName(table.to_string()),
    }
}

/// Generate a column expression refering to a specific table.
pub fn column(table: TableReference, name: &str) -> Expression {
    Expression::ColumnReference(ColumnReference::TableColumn {
        table,
        name: ColumnName(name.to_string()),
    })
}

// SELECTs //

/// Build a simple select *
pub fn star_select(from: From) -> Select {
    Select {
        select_list: SelectList::SelectStar,
        from: Some(from),
        joins: vec![],
        where_: Where(empty_where()),
        order_by: empty_order_by(),
        limit: empty_limit(),
    }
}

/// Build a `SELECT COUNT(*) AS "count"` over the given source.
pub fn count_select(from: From) -> Select {
    Select {
        select_list: SelectList::SelectList(vec![(
            make_column_alias("count".to_string()),
            Expression::Count(CountType::Star),
        )]),
        from: Some(from),
        joins: vec![],
        where_: Where(empty_where()),
        order_by: empty_order_by(),
        limit: empty_limit(),
    }
}
