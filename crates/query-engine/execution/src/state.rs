//! Transient state used by the query engine.
//!
//! This is initialized on startup.

use filter_query_configuration::Configuration;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info_span, Instrument};

use crate::metrics;

/// Create a connection pool with the configured settings.
/// - <https://docs.rs/sqlx/latest/sqlx/pool/struct.PoolOptions.html>
pub async fn create_pool(configuration: &Configuration) -> Result<PgPool, InitializationError> {
    let pool_settings = &configuration.pool_settings;

    PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(pool_settings.pool_timeout))
        .idle_timeout(
            pool_settings
                .idle_timeout
                .map(std::time::Duration::from_secs),
        )
        .max_lifetime(
            pool_settings
                .connection_lifetime
                .map(std::time::Duration::from_secs),
        )
        .connect(&configuration.connection_uri)
        .instrument(info_span!("Create connection pool"))
        .await
        .map_err(InitializationError::UnableToCreatePool)
}

/// Register the metrics of a new engine.
pub fn create_metrics(
    metrics_registry: &mut prometheus::Registry,
) -> Result<metrics::Metrics, InitializationError> {
    info_span!("Setup metrics")
        .in_scope(|| metrics::Metrics::initialize(metrics_registry))
        .map_err(InitializationError::MetricsError)
}

/// State initialization error.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("unable to initialize connection pool: {0}")]
    UnableToCreatePool(sqlx::Error),
    #[error("error initializing metrics: {0}")]
    MetricsError(prometheus::Error),
}
