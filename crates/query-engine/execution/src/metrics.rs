//! Metrics setup and update for query execution.

use std::time::Duration;

use prometheus::core::{AtomicF64, AtomicI64, AtomicU64, GenericCounter, GenericGauge};
use prometheus::Histogram;

/// The collection of all metrics exposed through the `/metrics` endpoint.
#[derive(Debug, Clone)]
pub struct Metrics {
    query_total: GenericCounter<AtomicU64>,
    template_total: GenericCounter<AtomicU64>,
    row_shape_cache_miss_total: GenericCounter<AtomicU64>,
    query_seconds: Histogram,
    pool_size: GenericGauge<AtomicI64>,
    pool_idle_count: GenericGauge<AtomicI64>,
    pool_active_count: GenericGauge<AtomicI64>,
    pool_max_connections: GenericGauge<AtomicI64>,
    pool_acquire_timeout: GenericGauge<AtomicF64>,
    pool_idle_timeout: GenericGauge<AtomicF64>,
    pool_max_lifetime: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Set up counters, gauges and histograms used to produce Prometheus metrics
    pub fn initialize(
        metrics_registry: &mut prometheus::Registry,
    ) -> Result<Self, prometheus::Error> {
        let query_total = add_int_counter_metric(
            metrics_registry,
            "filter_query_query_total",
            "Total successful queries.",
        )?;

        let template_total = add_int_counter_metric(
            metrics_registry,
            "filter_query_template_total",
            "Total successful queries run from a template.",
        )?;

        let row_shape_cache_miss_total = add_int_counter_metric(
            metrics_registry,
            "filter_query_row_shape_cache_miss_total",
            "Row shapes built because no cached shape existed.",
        )?;

        let query_seconds = add_histogram_metric(
            metrics_registry,
            "filter_query_query_seconds",
            "Time taken by the database to answer a statement, in seconds.",
        )?;

        let pool_size = add_int_gauge_metric(
            metrics_registry,
            "filter_query_pool_size",
            "The number of connections currently active. This includes idle connections.",
        )?;

        let pool_idle_count = add_int_gauge_metric(
            metrics_registry,
            "filter_query_pool_idle",
            "The number of connections active and idle (not in use).",
        )?;

        let pool_active_count = add_int_gauge_metric(
            metrics_registry,
            "filter_query_pool_active",
            "The number of connections current active. This does not include idle connections.",
        )?;

        let pool_max_connections = add_int_gauge_metric(
            metrics_registry,
            "filter_query_pool_max_connections",
            "The maximum number of connections that this pool should maintain.",
        )?;

        let pool_acquire_timeout = add_gauge_metric(
            metrics_registry,
            "filter_query_pool_acquire_timeout",
            "Get the maximum amount of time to spend waiting for a connection, in seconds.",
        )?;

        let pool_idle_timeout = add_gauge_metric(
            metrics_registry,
            "filter_query_pool_idle_timeout",
            "Get the maximum idle duration for individual connections, in seconds.",
        )?;

        let pool_max_lifetime = add_gauge_metric(
            metrics_registry,
            "filter_query_pool_max_lifetime",
            "Get the maximum lifetime of individual connections, in seconds.",
        )?;

        Ok(Self {
            query_total,
            template_total,
            row_shape_cache_miss_total,
            query_seconds,
            pool_size,
            pool_idle_count,
            pool_active_count,
            pool_max_connections,
            pool_acquire_timeout,
            pool_idle_timeout,
            pool_max_lifetime,
        })
    }

    pub fn record_successful_query(&self) {
        self.query_total.inc();
    }

    pub fn record_successful_template_query(&self) {
        self.template_total.inc();
    }

    pub fn record_row_shape_cache_miss(&self) {
        self.row_shape_cache_miss_total.inc();
    }

    pub fn observe_query_duration(&self, duration: Duration) {
        self.query_seconds.observe(duration.as_secs_f64());
    }

    /// Update all pool metrics from the current state of the pool.
    pub fn update_pool_metrics(&self, pool: &sqlx::PgPool) {
        let pool_size: i64 = pool.size().into();
        self.pool_size.set(pool_size);

        let pool_idle: i64 = i64::try_from(pool.num_idle()).unwrap_or(i64::MAX);
        self.pool_idle_count.set(pool_idle);

        let pool_active: i64 = pool_size - pool_idle;
        self.pool_active_count.set(pool_active);

        let pool_options = pool.options();

        let max_connections: i64 = pool_options.get_max_connections().into();
        self.pool_max_connections.set(max_connections);

        let acquire_timeout: f64 = pool_options.get_acquire_timeout().as_secs_f64();
        self.pool_acquire_timeout.set(acquire_timeout);

        // if nothing is set, return 0
        let idle_timeout: f64 = pool_options
            .get_idle_timeout()
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        self.pool_idle_timeout.set(idle_timeout);

        // if nothing is set, return 0
        let max_lifetime: f64 = pool_options
            .get_max_lifetime()
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        self.pool_max_lifetime.set(max_lifetime);
    }
}

/// Create a new int counter metric and register it with the provided Prometheus Registry
fn add_int_counter_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericCounter<AtomicU64>, prometheus::Error> {
    let int_counter =
        prometheus::IntCounter::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    register_collector(metrics_registry, int_counter)
}

/// Create a new int gauge metric and register it with the provided Prometheus Registry
fn add_int_gauge_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericGauge<AtomicI64>, prometheus::Error> {
    let int_gauge =
        prometheus::IntGauge::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    register_collector(metrics_registry, int_gauge)
}

/// Create a new gauge metric and register it with the provided Prometheus Registry
fn add_gauge_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericGauge<AtomicF64>, prometheus::Error> {
    let gauge =
        prometheus::Gauge::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    register_collector(metrics_registry, gauge)
}

/// Create a new histogram metric, using the default buckets, and register it
/// with the provided Prometheus Registry
fn add_histogram_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<Histogram, prometheus::Error> {
    let histogram = Histogram::with_opts(prometheus::HistogramOpts::new(
        metric_name,
        metric_description,
    ))?;
    register_collector(metrics_registry, histogram)
}

/// Register a new collector with the registry, and return it for later use.
fn register_collector<Collector: prometheus::core::Collector + std::clone::Clone + 'static>(
    metrics_registry: &mut prometheus::Registry,
    collector: Collector,
) -> Result<Collector, prometheus::Error> {
    metrics_registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}
