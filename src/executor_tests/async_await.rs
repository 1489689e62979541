use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use itertools::Itertools as _;
use pretty_assertions::assert_eq;

use crate::{
    CodeRegistry, DataFetcher, DataFetcherResult, Execution, ExecutionContext, ExecutionStrategy,
    FetchedValue, FnDataFetcher, ParallelExecutionStrategy, SerialExecutionStrategy,
    SimpleExecutionStrategy, Variables,
    ast::{Definition, Field, Operation, OperationType, OwnedDocument, Selection, Type},
    schema::{meta::ObjectMeta, model::SchemaType},
};

type Log = Arc<Mutex<Vec<String>>>;

fn document(op_type: OperationType, names: &[&str]) -> OwnedDocument {
    vec![Definition::Operation(Operation::new(
        op_type,
        names
            .iter()
            .map(|n| Selection::field(Field::new(*n)))
            .collect(),
    ))]
}

/// Fetcher logging when it starts and when its value arrives `delay_ms`
/// later.
fn delayed(log: &Log, name: &'static str, delay_ms: u64) -> impl DataFetcher + 'static {
    let log = log.clone();
    FnDataFetcher::new(move |_| {
        log.lock().unwrap().push(format!("start {name}"));
        let log = log.clone();
        Ok(FetchedValue::future(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            log.lock().unwrap().push(format!("end {name}"));
            Ok(FetchedValue::value(name))
        }))
    })
}

fn schema_and_registry(root: &str, log: &Log) -> (SchemaType, CodeRegistry) {
    let root_type = ObjectMeta::new(root)
        .field("slow", Type::non_null_named("String"))
        .field("fast", Type::non_null_named("String"))
        .field("medium", Type::non_null_named("String"));
    let schema = if root == "Query" {
        SchemaType::new(root_type)
    } else {
        SchemaType::new(ObjectMeta::new("Query").field("slow", Type::named("String")))
            .with_mutation(root_type)
    };
    let registry = CodeRegistry::new()
        .data_fetcher(root, "slow", delayed(log, "slow", 80))
        .data_fetcher(root, "fast", delayed(log, "fast", 10))
        .data_fetcher(root, "medium", delayed(log, "medium", 40));
    (schema, registry)
}

async fn run_with(strategy: impl ExecutionStrategy + 'static, log: &Log) -> crate::Value {
    let (schema, registry) = schema_and_registry("Query", log);
    let out = Execution::new()
        .query_strategy(strategy)
        .execute(
            &document(OperationType::Query, &["slow", "fast", "medium"]),
            None,
            &Variables::new(),
            graphql_value!({}),
            ExecutionContext::builder(Arc::new(schema)).code_registry(registry),
        )
        .await
        .expect("Execution failed");
    assert_eq!(out.errors, []);
    out.data
}

#[tokio::test]
async fn all_strategies_keep_collection_order() {
    let expected = graphql_value!({"slow": "slow", "fast": "fast", "medium": "medium"});

    let log = Log::default();
    assert_eq!(run_with(ParallelExecutionStrategy::new(), &log).await, expected);
    assert_eq!(run_with(SerialExecutionStrategy::new(), &log).await, expected);
    assert_eq!(run_with(SimpleExecutionStrategy, &log).await, expected);
}

#[tokio::test]
async fn parallel_starts_siblings_before_any_completes() {
    let log = Log::default();

    run_with(ParallelExecutionStrategy::new(), &log).await;

    let log = log.lock().unwrap();
    assert_eq!(
        log[..3].iter().sorted().collect_vec(),
        ["start fast", "start medium", "start slow"],
    );
    assert_eq!(log.last().map(String::as_str), Some("end slow"));
}

#[tokio::test]
async fn serial_completes_each_field_before_the_next() {
    let log = Log::default();

    run_with(SerialExecutionStrategy::new(), &log).await;

    assert_eq!(
        *log.lock().unwrap(),
        [
            "start slow",
            "end slow",
            "start fast",
            "end fast",
            "start medium",
            "end medium",
        ],
    );
}

#[tokio::test]
async fn mutations_run_serially_by_default() {
    let log = Log::default();
    let (schema, registry) = schema_and_registry("Mutation", &log);

    let out = crate::execute(
        &document(OperationType::Mutation, &["slow", "fast"]),
        None,
        &Variables::new(),
        graphql_value!({}),
        ExecutionContext::builder(Arc::new(schema)).code_registry(registry),
    )
    .await
    .expect("Execution failed");

    assert_eq!(out.data, graphql_value!({"slow": "slow", "fast": "fast"}));
    assert_eq!(
        log.lock().unwrap().iter().join(", "),
        "start slow, end slow, start fast, end fast",
    );
}

#[tokio::test]
async fn serial_waits_for_sub_selections() {
    let log = Log::default();
    let schema = SchemaType::new(ObjectMeta::new("Query").field("a", Type::named("Int")))
        .with_mutation(
            ObjectMeta::new("Mutation")
                .field("first", Type::named("Payload"))
                .field("second", Type::named("Payload")),
        )
        .with_type(ObjectMeta::new("Payload").field("slow", Type::non_null_named("String")));
    let registry = CodeRegistry::new()
        .data_fetcher("Payload", "slow", delayed(&log, "slow", 30))
        .data_fetcher(
            "Mutation",
            "second",
            FnDataFetcher::new({
                let log = log.clone();
                move |_| {
                    log.lock().unwrap().push("start second".into());
                    Ok(FetchedValue::value(graphql_value!({})))
                }
            }),
        );
    let payload = |name: &str| {
        Selection::field(
            Field::new(name).selection_set(vec![Selection::field(Field::new("slow"))]),
        )
    };
    let doc = vec![Definition::Operation(Operation::new(
        OperationType::Mutation,
        vec![payload("first"), payload("second")],
    ))];

    let out = crate::execute(
        &doc,
        None,
        &Variables::new(),
        graphql_value!({"first": {}}),
        ExecutionContext::builder(Arc::new(schema)).code_registry(registry),
    )
    .await
    .expect("Execution failed");

    assert_eq!(
        out.data,
        graphql_value!({"first": {"slow": "slow"}, "second": {"slow": "slow"}}),
    );
    assert_eq!(
        log.lock().unwrap()[..3],
        ["start slow", "end slow", "start second"],
    );
}

#[tokio::test]
async fn async_failure_is_reported_like_sync_one() {
    let doc = document(OperationType::Query, &["a", "b"]);
    let schema = SchemaType::new(
        ObjectMeta::new("Query")
            .field("a", Type::named("String"))
            .field("b", Type::named("String")),
    );
    let registry = CodeRegistry::new().data_fetcher(
        "Query",
        "a",
        FnDataFetcher::new(|_| {
            Ok(FetchedValue::future(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Err("timed out".into())
            }))
        }),
    );

    let out = crate::execute(
        &doc,
        None,
        &Variables::new(),
        graphql_value!({"b": "b"}),
        ExecutionContext::builder(Arc::new(schema)).code_registry(registry),
    )
    .await
    .expect("Execution failed");

    assert_eq!(out.data, graphql_value!({"a": null, "b": "b"}));
    assert_eq!(out.errors.len(), 1);
    assert_eq!(
        out.errors[0].message(),
        "Exception while fetching data (/a) : timed out",
    );
}

#[tokio::test]
async fn unwraps_nested_async_envelopes() {
    let doc = document(OperationType::Query, &["a"]);
    let schema = SchemaType::new(ObjectMeta::new("Query").field("a", Type::named("Int")));
    let registry = CodeRegistry::new().data_fetcher(
        "Query",
        "a",
        FnDataFetcher::new(|_| {
            Ok(FetchedValue::future(async {
                Ok(DataFetcherResult::new(FetchedValue::future(async {
                    Ok(FetchedValue::optional(Some(FetchedValue::value(5))))
                }))
                .into())
            }))
        }),
    );

    let out = crate::execute(
        &doc,
        None,
        &Variables::new(),
        graphql_value!({}),
        ExecutionContext::builder(Arc::new(schema)).code_registry(registry),
    )
    .await
    .expect("Execution failed");

    assert_eq!(out.errors, []);
    assert_eq!(out.data, graphql_value!({"a": 5}));
}
