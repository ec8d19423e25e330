//! Run generated statements against the database.

use std::time::Instant;

use query_engine_sql::sql;
use sqlx::Row;
use tracing::{info_span, Instrument};

use crate::error::Error;
use crate::metrics::Metrics;
use crate::rows::{decode_row, DynamicRow, RowShape, RowShapeCache};

/// Run a statement and decode every row it returns, with the row shape cached
/// under `shape_key`.
pub async fn fetch_rows(
    pool: &sqlx::PgPool,
    metrics: &Metrics,
    shapes: &RowShapeCache,
    shape_key: &str,
    query: &sql::string::SQL,
) -> Result<Vec<DynamicRow>, Error> {
    tracing::debug!(
        generated_sql = %query.sql,
        params = query.params.len(),
        "fetching rows"
    );

    let rows = timed(metrics, build_query_with_params(query).fetch_all(pool))
        .instrument(info_span!("Database request", statement = "rows"))
        .await?;

    let Some(first) = rows.first() else {
        // nothing to learn a shape from
        return Ok(vec![]);
    };
    let (shape, built) = shapes.get_or_build(shape_key, || RowShape::from_columns(first.columns()));
    if built {
        metrics.record_row_shape_cache_miss();
    }
    tracing::debug!(rows = rows.len(), cached_shape = !built, "decoding rows");

    async {
        rows.iter()
            .map(|row| decode_row(&shape, row))
            .collect::<Result<Vec<_>, Error>>()
    }
    .instrument(info_span!("Decode rows"))
    .await
}

/// Run a `SELECT COUNT(*)` statement.
pub async fn fetch_count(
    pool: &sqlx::PgPool,
    metrics: &Metrics,
    query: &sql::string::SQL,
) -> Result<u64, Error> {
    tracing::debug!(
        generated_sql = %query.sql,
        params = query.params.len(),
        "fetching count"
    );

    let row = timed(metrics, build_query_with_params(query).fetch_one(pool))
        .instrument(info_span!("Database request", statement = "count"))
        .await?;

    let count: i64 = row.try_get(0)?;
    u64::try_from(count).map_err(|_| Error::Decode {
        column: "count".to_string(),
        reason: format!("negative count {count}"),
    })
}

async fn timed<T>(
    metrics: &Metrics,
    request: impl std::future::Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, sqlx::Error> {
    let start = Instant::now();
    let result = request.await;
    metrics.observe_query_duration(start.elapsed());
    result
}

/// Create a SQLx query based on our SQL query and bind our parameters to it.
fn build_query_with_params(
    query: &sql::string::SQL,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let sqlx_query = sqlx::query(query.sql.as_str());

    query
        .params
        .iter()
        .fold(sqlx_query, |sqlx_query, param| match param {
            sql::string::Param::String(s) => sqlx_query.bind(s),
            sql::string::Param::Value(value) => match value {
                sql::ast::Value::Int4(i) => sqlx_query.bind(*i),
                sql::ast::Value::Int8(i) => sqlx_query.bind(*i),
                sql::ast::Value::Float4(f) => sqlx_query.bind(*f),
                sql::ast::Value::Float8(f) => sqlx_query.bind(*f),
                sql::ast::Value::Bool(b) => sqlx_query.bind(*b),
                sql::ast::Value::String(s) => sqlx_query.bind(s),
                sql::ast::Value::Date(date) => sqlx_query.bind(*date),
                sql::ast::Value::Timestamp(timestamp) => sqlx_query.bind(*timestamp),
            },
        })
}
