//! Statements planned for the sample configuration, and the requests rejected
//! before any of them reach the database.

use std::sync::Arc;

use filter_query_configuration::environment::FixedEnvironment;
use filter_query_configuration::{make_runtime_configuration, parse_configuration, Configuration};
use query_engine_execution::error::Error;
use query_engine_execution::metrics::Metrics;
use query_engine_execution::query::{plan_page, plan_single_row, QueryEngine, QuerySource};
use query_engine_metadata::metadata::{FieldType, FilterOperation};
use query_engine_sql::sql::ast::Value;
use query_engine_sql::sql::string::{Param, ValueBinding};
use query_engine_translation::translation::criteria::{translate, CriteriaValue, SearchCriteria};
use query_engine_translation::translation::pagination::{PageRequest, SortDirection};
use query_engine_translation::translation::values::ScalarValue;
use tests_common::deployment::{get_configuration_directory, SAMPLE_CONFIGURATION};
use tests_common::fixtures::params;

async fn sample_configuration() -> Configuration {
    let parsed = parse_configuration(get_configuration_directory(SAMPLE_CONFIGURATION))
        .await
        .unwrap();
    make_runtime_configuration(
        parsed,
        FixedEnvironment::from([("FILTER_QUERY_DATABASE_URL", "postgresql://localhost/filter")]),
    )
    .unwrap()
}

/// An engine whose pool never connects unless a query is run.
async fn lazy_engine() -> QueryEngine {
    let configuration = sample_configuration().await;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy(&configuration.connection_uri)
        .unwrap();
    let metrics = Metrics::initialize(&mut prometheus::Registry::new()).unwrap();
    QueryEngine::new(pool, Arc::new(configuration), metrics)
}

#[tokio::test]
async fn entity_page_and_count_share_the_predicate() {
    let configuration = sample_configuration().await;
    let filters = &configuration.filter_set("employees").unwrap().filters;
    let criteria = translate(
        &params([("ageFrom", "30"), ("ageTo", "40"), ("department", "Sales")]),
        filters,
    )
    .unwrap();

    let plan = plan_page(
        &configuration,
        &QuerySource::Entity("employee".to_string()),
        &criteria,
        &PageRequest::new(2, 10).sorted_by("age", SortDirection::Asc),
    )
    .unwrap();

    let from_and_where = concat!(
        r#"FROM "public"."employee" AS "employee_0""#,
        r#" LEFT OUTER JOIN "public"."department" AS "department_1""#,
        r#" ON ("employee_0"."department_id" = "department_1"."id")"#,
        r#" WHERE ((("employee_0"."age" >= $1) AND ("employee_0"."age" <= $2))"#,
        r#" AND ("department_1"."name" = $3))"#,
    );
    similar_asserts::assert_eq!(
        plan.rows.sql,
        format!(
            r#"SELECT "employee_0".* {from_and_where} ORDER BY "employee_0"."age" ASC LIMIT 10 OFFSET 20"#
        )
    );
    similar_asserts::assert_eq!(
        plan.count.sql,
        format!(r#"SELECT COUNT(*) AS "count" {from_and_where}"#)
    );
    assert_eq!(
        plan.rows.params,
        vec![
            Param::Value(Value::Int4(30)),
            Param::Value(Value::Int4(40)),
            Param::String("Sales".to_string()),
        ]
    );
    assert_eq!(plan.rows.params, plan.count.params);
    assert_eq!(plan.shape_key, "entity:employee");
    assert!(!plan.from_template);
}

#[tokio::test]
async fn template_from_file_is_filled_in() {
    let configuration = sample_configuration().await;
    let filters = &configuration.filter_set("departmentEmployees").unwrap().filters;
    let criteria = translate(&params([("department", "Sales"), ("minAge", "30")]), filters).unwrap();

    let plan = plan_page(
        &configuration,
        &QuerySource::Template("employeesByDepartment".to_string()),
        &criteria,
        &PageRequest::new(0, 5).sorted_by("e__name", SortDirection::Desc),
    )
    .unwrap();

    similar_asserts::assert_eq!(
        plan.rows.sql,
        concat!(
            "SELECT e.id, e.name, e.age, d.name AS department\n",
            "FROM public.employee e\n",
            "JOIN public.department d ON d.id = e.department_id\n",
            "WHERE d.name = $1 AND e.age >= $2\n",
            "ORDER BY e.name DESC LIMIT 5 OFFSET 0\n"
        )
    );
    similar_asserts::assert_eq!(
        plan.count.sql,
        concat!(
            "SELECT COUNT(*) FROM (",
            "SELECT e.id, e.name, e.age, d.name AS department\n",
            "FROM public.employee e\n",
            "JOIN public.department d ON d.id = e.department_id\n",
            "WHERE d.name = $1 AND e.age >= $2\n",
            "\n",
            ") AS count_query"
        )
    );
    assert_eq!(
        plan.rows.params,
        vec![
            Param::String("Sales".to_string()),
            Param::Value(Value::Int4(30)),
        ]
    );
    assert!(plan.from_template);
    assert!(plan.shape_key.starts_with("SELECT e.id"));
}

#[tokio::test]
async fn inline_template_without_criteria() {
    let configuration = sample_configuration().await;

    let plan = plan_page(
        &configuration,
        &QuerySource::Template("headcount".to_string()),
        &[],
        &PageRequest::new(0, 3),
    )
    .unwrap();

    similar_asserts::assert_eq!(
        plan.rows.sql,
        "SELECT d.name, COUNT(*) AS headcount FROM public.department d JOIN public.employee e ON e.department_id = d.id  GROUP BY d.name LIMIT 3 OFFSET 0"
    );
    assert!(plan.rows.params.is_empty());
}

#[tokio::test]
async fn raw_template_text_is_accepted() {
    let configuration = sample_configuration().await;
    let criteria = vec![SearchCriteria::new(
        "status",
        FilterOperation::In,
        CriteriaValue::Delimited("OPEN, CLOSED".to_string()),
        FieldType::String,
    )];

    let plan = plan_single_row(
        &configuration,
        &QuerySource::Template("SELECT * FROM public.ticket ${whereClause}".to_string()),
        &criteria,
    )
    .unwrap();

    similar_asserts::assert_eq!(
        plan.rows.sql,
        "SELECT * FROM public.ticket WHERE status IN ($1, $2)"
    );
    assert_eq!(
        plan.rows.params,
        vec![
            Param::String("OPEN".to_string()),
            Param::String("CLOSED".to_string()),
        ]
    );
}

#[tokio::test]
async fn unknown_template_is_not_found() {
    let configuration = sample_configuration().await;

    let error = plan_page(
        &configuration,
        &QuerySource::Template("SELECT * FROM public.ticket".to_string()),
        &[],
        &PageRequest::new(0, 5),
    )
    .unwrap_err();

    assert!(matches!(error, Error::TemplateNotFound(_)));
    assert!(error.is_client_error());
}

#[tokio::test]
async fn single_entity_row_probes_for_a_second_match() {
    let configuration = sample_configuration().await;
    let criteria = vec![SearchCriteria::new(
        "id",
        FilterOperation::Equal,
        CriteriaValue::Scalar(ScalarValue::Integer(7)),
        FieldType::Integer,
    )];

    let plan = plan_single_row(
        &configuration,
        &QuerySource::Entity("employee".to_string()),
        &criteria,
    )
    .unwrap();

    similar_asserts::assert_eq!(
        plan.rows.sql,
        r#"SELECT "employee_0".* FROM "public"."employee" AS "employee_0" WHERE ("employee_0"."id" = $1) LIMIT 2"#
    );
}

#[tokio::test]
async fn contains_on_a_number_is_rejected() {
    let configuration = sample_configuration().await;
    let criteria = vec![SearchCriteria::new(
        "age",
        FilterOperation::Contains,
        CriteriaValue::Scalar(ScalarValue::String("4".to_string())),
        FieldType::String,
    )];

    let error = plan_page(
        &configuration,
        &QuerySource::Entity("employee".to_string()),
        &criteria,
        &PageRequest::new(0, 5),
    )
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "CONTAINS is not supported on 'age' of type integer"
    );
    assert!(!error.is_client_error());
}

#[tokio::test]
async fn literals_can_be_inlined() {
    let mut configuration = sample_configuration().await;
    configuration.value_binding = ValueBinding::InlineLiterals;
    let filters = &configuration.filter_set("employees").unwrap().filters;
    let criteria = translate(&params([("department", "O'Neil & Co")]), filters).unwrap();

    let plan = plan_page(
        &configuration,
        &QuerySource::Entity("employee".to_string()),
        &criteria,
        &PageRequest::new(0, 5),
    )
    .unwrap();

    assert!(plan
        .rows
        .sql
        .ends_with(r#"WHERE ("department_1"."name" = 'O''Neil & Co') LIMIT 5 OFFSET 0"#));
    assert!(plan.rows.params.is_empty());
}

#[tokio::test]
async fn page_size_is_clamped_to_the_configured_bounds() {
    let engine = lazy_engine().await;

    assert_eq!(engine.clamp(PageRequest::new(0, 0)).size, 10);
    assert_eq!(engine.clamp(PageRequest::new(0, 500)).size, 100);
    assert_eq!(engine.clamp(PageRequest::new(3, 25)), PageRequest::new(3, 25));
}

#[tokio::test]
async fn template_pages_are_clamped_too() {
    let engine = lazy_engine().await;

    let plan = engine
        .plan_template_page("headcount", &[], &PageRequest::new(0, 0))
        .unwrap();
    assert!(plan.rows.sql.ends_with("LIMIT 10 OFFSET 0"), "{}", plan.rows.sql);

    let plan = engine
        .plan_template_page("headcount", &[], &PageRequest::new(2, 500))
        .unwrap();
    assert!(plan.rows.sql.ends_with("LIMIT 100 OFFSET 200"), "{}", plan.rows.sql);
}

fn gauge(registry: &prometheus::Registry, name: &str) -> f64 {
    registry
        .gather()
        .iter()
        .find(|family| family.get_name() == name)
        .map(|family| family.get_metric()[0].get_gauge().get_value())
        .unwrap()
}

#[tokio::test]
async fn pool_gauges_are_refreshed_when_statements_run() {
    let configuration = sample_configuration().await;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(3)
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy("postgresql://127.0.0.1:1/filter")
        .unwrap();
    let mut registry = prometheus::Registry::new();
    let metrics = Metrics::initialize(&mut registry).unwrap();
    let engine = QueryEngine::new(pool, Arc::new(configuration), metrics);
    assert_eq!(gauge(&registry, "filter_query_pool_max_connections"), 0.0);

    let result = engine
        .find_one(&QuerySource::Entity("employee".to_string()), &[])
        .await;
    assert!(result.is_err());
    assert_eq!(gauge(&registry, "filter_query_pool_max_connections"), 3.0);
    assert_eq!(gauge(&registry, "filter_query_pool_acquire_timeout"), 0.2);
}

#[tokio::test]
async fn invalid_requests_fail_before_reaching_the_database() {
    let engine = lazy_engine().await;

    let error = engine
        .search("employees", &params([("ageFrom", "30")]), PageRequest::new(0, 5))
        .await
        .unwrap_err();
    let response = error.to_error_response();
    assert_eq!(response.message, "Validation failed");
    assert_eq!(
        response.errors.get("ageTo").map(String::as_str),
        Some("Both ageFrom and ageTo must be present.")
    );

    let error = engine
        .search(
            "employees",
            &params([]),
            PageRequest::new(0, 5).sorted_by("salary", SortDirection::Asc),
        )
        .await
        .unwrap_err();
    assert_eq!(
        error.to_error_response().errors.get("sortBy").map(String::as_str),
        Some("Sorting by salary is not allowed")
    );

    let error = engine
        .search("departmentEmployees", &params([]), PageRequest::new(0, 5))
        .await
        .unwrap_err();
    assert!(matches!(error, Error::FilterSetWithoutEntity(_)));
    assert_eq!(error.to_error_response().message, "Internal error");

    let error = engine
        .search("nothing", &params([]), PageRequest::new(0, 5))
        .await
        .unwrap_err();
    assert!(matches!(error, Error::FilterSetNotFound(_)));

    let error = engine
        .search_template("employeesByDepartment", &params([]), PageRequest::new(0, 5))
        .await
        .unwrap_err();
    assert_eq!(
        error.to_error_response().errors.get("department").map(String::as_str),
        Some("This parameter is required.")
    );
}
