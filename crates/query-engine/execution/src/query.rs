//! Plan and run paged, counted and single-row queries, either over an entity
//! or from a query template.

use std::fmt;
use std::sync::Arc;

use filter_query_configuration::Configuration;
use query_engine_metadata::metadata::FilterSetInfo;
use query_engine_sql::sql;
use query_engine_translation::translation::criteria::{self, SearchCriteria};
use query_engine_translation::translation::pagination::{PageRequest, PagedResponse};
use query_engine_translation::translation::parameters::ParameterSource;
use query_engine_translation::translation::query::PredicateBuilder;
use query_engine_translation::translation::template::{
    self, PAGINATION_PLACEHOLDER, WHERE_CLAUSE_PLACEHOLDER,
};
use tracing::{info_span, Instrument};

use crate::error::Error;
use crate::execution;
use crate::metrics::Metrics;
use crate::rows::{DynamicRow, RowShapeCache};
use crate::state::{self, InitializationError};

/// Where rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// Rows of an entity, filtered by a predicate over it and its relationships.
    Entity(String),
    /// The name of a configured template, or the text of a template.
    Template(String),
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySource::Entity(entity) => write!(f, "entity {entity}"),
            QuerySource::Template(template) => write!(f, "template {template}"),
        }
    }
}

/// The statements answering a page request.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub rows: sql::string::SQL,
    pub count: sql::string::SQL,
    /// The row shape cache key.
    pub shape_key: String,
    pub from_template: bool,
}

/// The statement answering a request for at most one row.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleRowPlan {
    pub rows: sql::string::SQL,
    pub shape_key: String,
    pub from_template: bool,
}

/// Build the statements for one page and the total count.
pub fn plan_page(
    configuration: &Configuration,
    source: &QuerySource,
    criteria: &[SearchCriteria],
    page_request: &PageRequest,
) -> Result<PagePlan, Error> {
    let binding = configuration.value_binding;
    match source {
        QuerySource::Entity(entity) => {
            let builder = predicate_builder(configuration, entity);
            let predicate = builder.build_predicate(criteria)?;
            let count = render(&builder.count_query(&predicate)?, binding);
            let rows = render(&builder.page_query(predicate, page_request)?, binding);
            Ok(PagePlan {
                rows,
                count,
                shape_key: entity_shape_key(entity),
                from_template: false,
            })
        }
        QuerySource::Template(name) => {
            let text = template_text(configuration, name)?;
            let (rows, count) =
                template::translate_template_pair(text, criteria, page_request, binding)?;
            Ok(PagePlan {
                rows,
                count,
                shape_key: text.to_string(),
                from_template: true,
            })
        }
    }
}

/// Build the statement for a single row. Over an entity at most two rows are
/// fetched, enough to notice an ambiguous match.
pub fn plan_single_row(
    configuration: &Configuration,
    source: &QuerySource,
    criteria: &[SearchCriteria],
) -> Result<SingleRowPlan, Error> {
    let binding = configuration.value_binding;
    match source {
        QuerySource::Entity(entity) => {
            let builder = predicate_builder(configuration, entity);
            let predicate = builder.build_predicate(criteria)?;
            Ok(SingleRowPlan {
                rows: render(&builder.single_row_query(predicate)?, binding),
                shape_key: entity_shape_key(entity),
                from_template: false,
            })
        }
        QuerySource::Template(name) => {
            let text = template_text(configuration, name)?;
            Ok(SingleRowPlan {
                rows: template::translate_template_query(text, criteria, None, binding)?,
                shape_key: text.to_string(),
                from_template: true,
            })
        }
    }
}

fn predicate_builder<'a>(configuration: &'a Configuration, entity: &'a str) -> PredicateBuilder<'a> {
    let builder = PredicateBuilder::new(&configuration.metadata.entities, entity);
    match configuration.path_table(entity) {
        Some(path_table) => builder.with_path_table(path_table),
        None => builder,
    }
}

/// A configured template by name; otherwise the string itself when it carries
/// a placeholder.
fn template_text<'a>(configuration: &'a Configuration, name: &'a str) -> Result<&'a str, Error> {
    match configuration.template(name) {
        Some(template) => template.sql.sql().map_err(Error::StateInvariant),
        None if name.contains(WHERE_CLAUSE_PLACEHOLDER) || name.contains(PAGINATION_PLACEHOLDER) => {
            Ok(name)
        }
        None => Err(Error::TemplateNotFound(name.to_string())),
    }
}

fn entity_shape_key(entity: &str) -> String {
    format!("entity:{entity}")
}

fn render(select: &sql::ast::Select, binding: sql::string::ValueBinding) -> sql::string::SQL {
    let mut sql = sql::string::SQL::with_binding(binding);
    select.to_sql(&mut sql);
    sql
}

/// Runs queries for every request. Build one on startup and share it.
#[derive(Clone)]
pub struct QueryEngine {
    pool: sqlx::PgPool,
    configuration: Arc<Configuration>,
    metrics: Metrics,
    shapes: RowShapeCache,
}

impl QueryEngine {
    pub fn new(pool: sqlx::PgPool, configuration: Arc<Configuration>, metrics: Metrics) -> Self {
        QueryEngine {
            pool,
            configuration,
            metrics,
            shapes: RowShapeCache::default(),
        }
    }

    /// Register metrics and connect to the configured database.
    pub async fn connect(
        configuration: Configuration,
        metrics_registry: &mut prometheus::Registry,
    ) -> Result<Self, InitializationError> {
        let metrics = state::create_metrics(metrics_registry)?;
        let pool = state::create_pool(&configuration).await?;
        let engine = QueryEngine::new(pool, Arc::new(configuration), metrics);
        engine.refresh_pool_metrics();
        Ok(engine)
    }

    /// Bring the pool gauges up to date. Done whenever statements are about to run.
    pub fn refresh_pool_metrics(&self) {
        self.metrics.update_pool_metrics(&self.pool);
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// The page request with its size brought within the configured bounds.
    pub fn clamp(&self, page_request: PageRequest) -> PageRequest {
        let pagination = &self.configuration.pagination;
        page_request.clamped(pagination.default_page_size, pagination.max_page_size)
    }

    /// Validate raw parameters against a configured filter set.
    pub fn translate<P>(&self, filter_set: &str, parameters: &P) -> Result<Vec<SearchCriteria>, Error>
    where
        P: ParameterSource + ?Sized,
    {
        let info = self.filter_set(filter_set)?;
        Ok(criteria::translate(parameters, &info.filters)?)
    }

    /// One page of rows matching the criteria, and the number of rows across all pages.
    pub async fn paginate(
        &self,
        source: &QuerySource,
        criteria: &[SearchCriteria],
        page_request: PageRequest,
    ) -> Result<PagedResponse<DynamicRow>, Error> {
        let page_request = self.clamp(page_request);
        let plan = plan_page(&self.configuration, source, criteria, &page_request)?;
        let (content, total_count) = self
            .run_page(&plan)
            .instrument(info_span!("Paginate", source = %source, page = page_request.page, size = page_request.size))
            .await?;
        Ok(PagedResponse {
            content,
            total_count,
        })
    }

    /// Run a template for one page, returning the rows and the total count.
    pub async fn execute_template(
        &self,
        template: &str,
        criteria: &[SearchCriteria],
        page_request: &PageRequest,
    ) -> Result<(Vec<DynamicRow>, u64), Error> {
        let plan = self.plan_template_page(template, criteria, page_request)?;
        self.run_page(&plan)
            .instrument(info_span!("Execute template"))
            .await
    }

    /// The statements for one page of a template, with the page size clamped.
    pub fn plan_template_page(
        &self,
        template: &str,
        criteria: &[SearchCriteria],
        page_request: &PageRequest,
    ) -> Result<PagePlan, Error> {
        plan_page(
            &self.configuration,
            &QuerySource::Template(template.to_string()),
            criteria,
            &self.clamp(page_request.clone()),
        )
    }

    /// The single row matching the criteria, if any. More than one match is an error.
    pub async fn find_one(
        &self,
        source: &QuerySource,
        criteria: &[SearchCriteria],
    ) -> Result<Option<DynamicRow>, Error> {
        let plan = plan_single_row(&self.configuration, source, criteria)?;
        self.refresh_pool_metrics();
        let mut rows = execution::fetch_rows(
            &self.pool,
            &self.metrics,
            &self.shapes,
            &plan.shape_key,
            &plan.rows,
        )
        .instrument(info_span!("Find one", source = %source))
        .await?;

        if rows.len() > 1 {
            return Err(Error::StateInvariant(format!(
                "expected at most one row from {source}, found {}",
                rows.len()
            )));
        }
        self.record_success(plan.from_template);
        Ok(rows.pop())
    }

    /// Run a template that should match at most one row.
    pub async fn query_for_single_row(
        &self,
        template: &str,
        criteria: &[SearchCriteria],
    ) -> Result<Option<DynamicRow>, Error> {
        self.find_one(&QuerySource::Template(template.to_string()), criteria)
            .await
    }

    /// Validate parameters with a filter set and page through the entity it targets.
    /// Sorting is limited to the filter set's allowed columns, when it lists any.
    pub async fn search<P>(
        &self,
        filter_set: &str,
        parameters: &P,
        page_request: PageRequest,
    ) -> Result<PagedResponse<DynamicRow>, Error>
    where
        P: ParameterSource + ?Sized,
    {
        let info = self.filter_set(filter_set)?;
        let entity = info
            .entity
            .clone()
            .ok_or_else(|| Error::FilterSetWithoutEntity(filter_set.to_string()))?;
        check_sort_allowed(info, &page_request)?;
        let criteria = criteria::translate(parameters, &info.filters)?;
        self.paginate(&QuerySource::Entity(entity), &criteria, page_request)
            .await
    }

    /// Validate parameters with a template's filter set and page through the template.
    /// A template without a filter set takes no parameters.
    pub async fn search_template<P>(
        &self,
        template: &str,
        parameters: &P,
        page_request: PageRequest,
    ) -> Result<PagedResponse<DynamicRow>, Error>
    where
        P: ParameterSource + ?Sized,
    {
        let info = self
            .configuration
            .template(template)
            .ok_or_else(|| Error::TemplateNotFound(template.to_string()))?;
        let criteria = match &info.filter_set {
            Some(filter_set) => {
                let filter_set = self.filter_set(filter_set)?;
                check_sort_allowed(filter_set, &page_request)?;
                criteria::translate(parameters, &filter_set.filters)?
            }
            None => vec![],
        };
        self.paginate(
            &QuerySource::Template(template.to_string()),
            &criteria,
            page_request,
        )
        .await
    }

    fn filter_set(&self, name: &str) -> Result<&FilterSetInfo, Error> {
        self.configuration
            .filter_set(name)
            .ok_or_else(|| Error::FilterSetNotFound(name.to_string()))
    }

    async fn run_page(&self, plan: &PagePlan) -> Result<(Vec<DynamicRow>, u64), Error> {
        self.refresh_pool_metrics();
        let rows = execution::fetch_rows(
            &self.pool,
            &self.metrics,
            &self.shapes,
            &plan.shape_key,
            &plan.rows,
        )
        .await?;
        let total_count = execution::fetch_count(&self.pool, &self.metrics, &plan.count).await?;
        tracing::info!(rows = rows.len(), total_count, "fetched page");
        self.record_success(plan.from_template);
        Ok((rows, total_count))
    }

    fn record_success(&self, from_template: bool) {
        self.metrics.record_successful_query();
        if from_template {
            self.metrics.record_successful_template_query();
        }
    }
}

fn check_sort_allowed(info: &FilterSetInfo, page_request: &PageRequest) -> Result<(), Error> {
    if info.allowed_order_by.is_empty() {
        Ok(())
    } else {
        Ok(page_request.check_sort_allowed(&info.allowed_order_by)?)
    }
}
