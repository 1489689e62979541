use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::{
    CodeRegistry, DataFetcherResult, ErrorClassification, Execution, ExecutionAbort,
    ExecutionContext, ExecutionContextBuilder, ExecutionOptions, ExecutionOutput, FetchedValue,
    FnDataFetcher, GraphQLError, SourcePosition, Variables,
    ast::{Definition, Field, Operation, OperationType, OwnedDocument, Selection, Type},
    schema::{meta::ObjectMeta, model::SchemaType},
};

fn query(selections: Vec<Selection>) -> OwnedDocument {
    vec![Definition::Operation(Operation::new(OperationType::Query, selections))]
}

fn field(name: &str) -> Selection {
    Selection::field(Field::new(name))
}

fn object(name: &str, selections: Vec<Selection>) -> Selection {
    Selection::field(Field::new(name).selection_set(selections))
}

fn context(schema: SchemaType, registry: CodeRegistry) -> ExecutionContextBuilder {
    ExecutionContext::builder(Arc::new(schema)).code_registry(registry)
}

async fn run(
    document: &OwnedDocument,
    root_value: crate::Value,
    ctx: ExecutionContextBuilder,
) -> ExecutionOutput {
    crate::execute(document, None, &Variables::new(), root_value, ctx)
        .await
        .expect("Execution failed")
}

fn user_schema() -> SchemaType {
    SchemaType::new(
        ObjectMeta::new("Query")
            .field("user", Type::named("User"))
            .field("users", Type::list(Type::non_null_named("User"))),
    )
    .with_type(
        ObjectMeta::new("User")
            .field("id", Type::non_null_named("ID"))
            .field("name", Type::non_null_named("String"))
            .field("nickname", Type::named("String"))
            .field("greeting", Type::named("String")),
    )
}

#[tokio::test]
async fn resolves_properties_of_root_value() {
    let doc = query(vec![field("a"), field("b")]);
    let schema = SchemaType::new(
        ObjectMeta::new("Query")
            .field("a", Type::named("String"))
            .field("b", Type::named("Int")),
    );

    let out = run(
        &doc,
        graphql_value!({"b": 2, "a": "x"}),
        context(schema, CodeRegistry::new()),
    )
    .await;

    assert_eq!(out.errors, []);
    assert_eq!(out.data, graphql_value!({"a": "x", "b": 2}));
    assert_eq!(
        out.data
            .as_object_value()
            .expect("Result is not an object")
            .keys()
            .collect::<Vec<_>>(),
        ["a", "b"],
    );
}

#[tokio::test]
async fn failing_fetcher_nulls_its_field() {
    let doc = query(vec![field("x"), field("y")]);
    let schema = SchemaType::new(
        ObjectMeta::new("Query")
            .field("x", Type::named("String"))
            .field("y", Type::named("String")),
    );
    let registry = CodeRegistry::new().data_fetcher(
        "Query",
        "x",
        FnDataFetcher::new(|_| Err("boom".into())),
    );

    let out = run(&doc, graphql_value!({"y": "fine"}), context(schema, registry)).await;

    assert_eq!(out.data, graphql_value!({"x": null, "y": "fine"}));
    assert_eq!(out.errors.len(), 1);
    let err = &out.errors[0];
    assert_eq!(err.path().to_string(), "/x");
    assert_eq!(err.message(), "Exception while fetching data (/x) : boom");
    assert_eq!(err.error().message(), "boom");
    assert_eq!(err.classification(), ErrorClassification::DataFetchingException);
}

#[tokio::test]
async fn error_carries_field_location() {
    let doc = query(vec![Selection::field(
        Field::new("x").at(SourcePosition::new(3, 7)),
    )]);
    let schema = SchemaType::new(ObjectMeta::new("Query").field("x", Type::named("String")));
    let registry =
        CodeRegistry::new().data_fetcher("Query", "x", FnDataFetcher::new(|_| Err("nope".into())));

    let out = run(&doc, graphql_value!({}), context(schema, registry)).await;

    assert_eq!(out.errors[0].location(), &SourcePosition::new(3, 7));
}

#[tokio::test]
async fn null_in_non_null_field_bubbles_to_nullable_parent() {
    let doc = query(vec![object("user", vec![field("id"), field("name")])]);

    let out = run(
        &doc,
        graphql_value!({"user": {"id": "1", "name": null}}),
        context(user_schema(), CodeRegistry::new()),
    )
    .await;

    assert_eq!(out.data, graphql_value!({"user": null}));
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].path().to_string(), "/user/name");
    assert_eq!(
        out.errors[0].message(),
        "Cannot return null for non-nullable type: 'String' within parent 'User' (/user/name)",
    );
    assert_eq!(
        out.errors[0].classification(),
        ErrorClassification::NullValueInNonNullableField,
    );
}

#[tokio::test]
async fn null_bubbles_up_to_data() {
    let doc = query(vec![field("a"), field("b")]);
    let schema = SchemaType::new(
        ObjectMeta::new("Query")
            .field("a", Type::non_null_named("String"))
            .field("b", Type::named("String")),
    );

    let out = run(
        &doc,
        graphql_value!({"b": "b"}),
        context(schema, CodeRegistry::new()),
    )
    .await;

    assert_eq!(out.data, graphql_value!(null));
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].path().to_string(), "/a");
}

#[tokio::test]
async fn failed_non_null_field_bubbles_without_second_error() {
    let doc = query(vec![object("user", vec![field("name")])]);
    let registry =
        CodeRegistry::new().data_fetcher("User", "name", FnDataFetcher::new(|_| Err("db down".into())));

    let out = run(
        &doc,
        graphql_value!({"user": {}}),
        context(user_schema(), registry),
    )
    .await;

    assert_eq!(out.data, graphql_value!({"user": null}));
    assert_eq!(out.errors.len(), 1);
    assert_eq!(
        out.errors[0].classification(),
        ErrorClassification::DataFetchingException,
    );
}

#[tokio::test]
async fn completes_lists_with_indexed_paths() {
    let doc = query(vec![object("users", vec![field("name")])]);

    let out = run(
        &doc,
        graphql_value!({"users": [{"name": "Ann"}, {"name": "Bob"}]}),
        context(user_schema(), CodeRegistry::new()),
    )
    .await;

    assert_eq!(out.errors, []);
    assert_eq!(
        out.data,
        graphql_value!({"users": [{"name": "Ann"}, {"name": "Bob"}]}),
    );
}

#[tokio::test]
async fn null_element_in_non_null_list_nulls_the_list() {
    let doc = query(vec![object("users", vec![field("name")])]);

    let out = run(
        &doc,
        graphql_value!({"users": [{"name": "Ann"}, null]}),
        context(user_schema(), CodeRegistry::new()),
    )
    .await;

    assert_eq!(out.data, graphql_value!({"users": null}));
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].path().to_string(), "/users[1]");
}

#[tokio::test]
async fn non_list_value_for_list_field_is_an_error() {
    let doc = query(vec![object("users", vec![field("name")])]);

    let out = run(
        &doc,
        graphql_value!({"users": "nobody"}),
        context(user_schema(), CodeRegistry::new()),
    )
    .await;

    assert_eq!(out.data, graphql_value!({"users": null}));
    assert_eq!(out.errors[0].classification(), ErrorClassification::ValidationError);
}

#[tokio::test]
async fn invalid_leaf_value_is_nulled() {
    let doc = query(vec![field("count"), field("label")]);
    let schema = SchemaType::new(
        ObjectMeta::new("Query")
            .field("count", Type::named("Int"))
            .field("label", Type::named("String")),
    );

    let out = run(
        &doc,
        graphql_value!({"count": "many", "label": 3}),
        context(schema, CodeRegistry::new()),
    )
    .await;

    assert_eq!(out.data, graphql_value!({"count": null, "label": "3"}));
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].path().to_string(), "/count");
    assert_eq!(out.errors[0].classification(), ErrorClassification::ValidationError);
}

#[tokio::test]
async fn merges_fields_sharing_a_response_key() {
    let doc = query(vec![
        object("user", vec![field("id")]),
        field("other"),
        object("user", vec![field("name")]),
        Selection::field(Field::new("name").alias("alias")),
    ]);
    let schema = SchemaType::new(
        ObjectMeta::new("Query")
            .field("user", Type::named("User"))
            .field("other", Type::named("Int"))
            .field("name", Type::named("String")),
    )
    .with_type(
        ObjectMeta::new("User")
            .field("id", Type::named("ID"))
            .field("name", Type::named("String")),
    );

    let out = run(
        &doc,
        graphql_value!({"user": {"id": "1", "name": "Ann"}, "other": 1, "name": "root"}),
        context(schema, CodeRegistry::new()),
    )
    .await;

    assert_eq!(
        out.data,
        graphql_value!({
            "user": {"id": "1", "name": "Ann"},
            "other": 1,
            "alias": "root",
        }),
    );
}

#[tokio::test]
async fn typename_resolves_to_object_type() {
    let doc = query(vec![field("__typename"), object("user", vec![field("__typename")])]);

    let out = run(
        &doc,
        graphql_value!({"user": {}}),
        context(user_schema(), CodeRegistry::new()),
    )
    .await;

    assert_eq!(
        out.data,
        graphql_value!({"__typename": "Query", "user": {"__typename": "User"}}),
    );
}

#[tokio::test]
async fn passes_arguments_to_fetchers() {
    let doc = query(vec![Selection::field(
        Field::new("hello").argument("name", crate::ast::InputValue::scalar("Ann")),
    )]);
    let schema =
        SchemaType::new(ObjectMeta::new("Query").field("hello", Type::non_null_named("String")));
    let registry = CodeRegistry::new().data_fetcher(
        "Query",
        "hello",
        FnDataFetcher::new(|env| {
            let name = env
                .argument("name")
                .and_then(|v| v.as_string_value())
                .unwrap_or("World");
            Ok(FetchedValue::value(format!("Hello, {name}!")))
        }),
    );

    let out = run(&doc, graphql_value!({}), context(schema, registry)).await;

    assert_eq!(out.data, graphql_value!({"hello": "Hello, Ann!"}));
}

#[tokio::test]
async fn local_context_flows_to_sub_fields() {
    let doc = query(vec![object("user", vec![field("greeting"), field("id")])]);
    let registry = CodeRegistry::new()
        .data_fetcher(
            "Query",
            "user",
            FnDataFetcher::new(|_| {
                Ok(DataFetcherResult::new(graphql_value!({"id": "1", "name": "Ann"}))
                    .local_context(String::from("Hi"))
                    .error("partially loaded")
                    .into())
            }),
        )
        .data_fetcher(
            "User",
            "greeting",
            FnDataFetcher::new(|env| {
                let greeting = env.local_context_as::<String>().ok_or("no local context")?;
                let name = env
                    .source()
                    .as_object_value()
                    .and_then(|o| o.get_field_value("name"))
                    .and_then(|v| v.as_string_value())
                    .unwrap_or_default();
                Ok(FetchedValue::value(format!("{greeting}, {name}")))
            }),
        );

    let out = run(&doc, graphql_value!({}), context(user_schema(), registry)).await;

    assert_eq!(
        out.data,
        graphql_value!({"user": {"greeting": "Hi, Ann", "id": "1"}}),
    );
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].message(), "partially loaded");
    assert_eq!(out.errors[0].path().to_string(), "/user");
}

#[tokio::test]
async fn unboxes_optional_values() {
    let doc = query(vec![field("some"), field("none")]);
    let schema = SchemaType::new(
        ObjectMeta::new("Query")
            .field("some", Type::named("Int"))
            .field("none", Type::named("Int")),
    );
    let registry = CodeRegistry::new()
        .data_fetcher(
            "Query",
            "some",
            FnDataFetcher::new(|_| {
                Ok(FetchedValue::optional(Some(FetchedValue::optional(Some(
                    FetchedValue::value(7),
                )))))
            }),
        )
        .data_fetcher(
            "Query",
            "none",
            FnDataFetcher::new(|_| Ok(FetchedValue::optional(None))),
        );

    let out = run(&doc, graphql_value!({}), context(schema, registry)).await;

    assert_eq!(out.errors, []);
    assert_eq!(out.data, graphql_value!({"some": 7, "none": null}));
}

#[tokio::test]
async fn too_deeply_wrapped_value_aborts() {
    let doc = query(vec![field("a")]);
    let schema = SchemaType::new(ObjectMeta::new("Query").field("a", Type::named("Int")));
    let registry = CodeRegistry::new().data_fetcher(
        "Query",
        "a",
        FnDataFetcher::new(|_| {
            let mut value = FetchedValue::value(1);
            for _ in 0..3 {
                value = FetchedValue::optional(Some(value));
            }
            Ok(value)
        }),
    );
    let ctx = context(schema, registry).options(ExecutionOptions {
        max_unbox_depth: 2,
        ..ExecutionOptions::default()
    });

    let res = crate::execute(&doc, None, &Variables::new(), graphql_value!({}), ctx).await;

    assert_eq!(
        res,
        Err(GraphQLError::Aborted(ExecutionAbort::UnboxDepthExceeded {
            path: "/a".parse().unwrap(),
            max_depth: 2,
        })),
    );
}

#[tokio::test]
async fn value_no_unboxer_accepts_aborts() {
    let doc = query(vec![field("a")]);
    let schema = SchemaType::new(ObjectMeta::new("Query").field("a", Type::named("Int")));
    let registry = CodeRegistry::new().data_fetcher(
        "Query",
        "a",
        FnDataFetcher::new(|_| Ok(FetchedValue::optional(Some(FetchedValue::value(1))))),
    );
    let ctx = context(schema, registry).value_unboxers(vec![]);

    let res = crate::execute(&doc, None, &Variables::new(), graphql_value!({}), ctx).await;

    assert_eq!(
        res,
        Err(GraphQLError::Aborted(ExecutionAbort::Unresolved(
            "/a".parse().unwrap(),
        ))),
    );
}

#[tokio::test]
async fn unknown_field_aborts() {
    let doc = query(vec![field("missing")]);
    let schema = SchemaType::new(ObjectMeta::new("Query").field("a", Type::named("Int")));

    let res = crate::execute(
        &doc,
        None,
        &Variables::new(),
        graphql_value!({}),
        context(schema, CodeRegistry::new()),
    )
    .await;

    assert_eq!(
        res,
        Err(GraphQLError::Aborted(ExecutionAbort::UnknownField {
            parent_type: "Query".into(),
            field: "missing".into(),
        })),
    );
}

#[tokio::test]
async fn rejects_unsupported_operations() {
    let schema = Arc::new(SchemaType::new(
        ObjectMeta::new("Query").field("a", Type::named("Int")),
    ));

    for op_type in [OperationType::Mutation, OperationType::Subscription] {
        let doc = vec![Definition::Operation(Operation::new(op_type, vec![field("a")]))];

        let res = crate::execute(
            &doc,
            None,
            &Variables::new(),
            graphql_value!({}),
            ExecutionContext::builder(schema.clone()),
        )
        .await;

        assert_eq!(res, Err(GraphQLError::OperationNotSupported(op_type)));
    }
}

#[tokio::test]
async fn sorts_errors_when_asked() {
    let doc = query(vec![
        Selection::field(Field::new("b").at(SourcePosition::new(2, 0))),
        Selection::field(Field::new("a").at(SourcePosition::new(1, 0))),
    ]);
    let schema = || {
        SchemaType::new(
            ObjectMeta::new("Query")
                .field("a", Type::named("Int"))
                .field("b", Type::named("Int")),
        )
    };
    let failing = || FnDataFetcher::new(|_| Err("failed".into()));
    let registry = CodeRegistry::new()
        .data_fetcher("Query", "a", failing())
        .data_fetcher("Query", "b", failing());

    let unsorted = run(
        &doc,
        graphql_value!({}),
        context(schema(), registry),
    )
    .await;
    assert_eq!(
        unsorted
            .errors
            .iter()
            .map(|e| e.path().to_string())
            .collect::<Vec<_>>(),
        ["/b", "/a"],
    );

    let registry = CodeRegistry::new()
        .data_fetcher("Query", "a", failing())
        .data_fetcher("Query", "b", failing());
    let sorted = run(
        &doc,
        graphql_value!({}),
        context(schema(), registry).options(ExecutionOptions {
            sort_errors: true,
            ..ExecutionOptions::default()
        }),
    )
    .await;
    assert_eq!(
        sorted
            .errors
            .iter()
            .map(|e| e.path().to_string())
            .collect::<Vec<_>>(),
        ["/a", "/b"],
    );
}

#[tokio::test]
async fn mutations_use_mutation_root() {
    let doc = vec![Definition::Operation(
        Operation::new(OperationType::Mutation, vec![field("increment")]).named("Bump"),
    )];
    let schema = SchemaType::new(ObjectMeta::new("Query").field("a", Type::named("Int")))
        .with_mutation(ObjectMeta::new("Mutation").field("increment", Type::non_null_named("Int")));
    let registry = CodeRegistry::new().data_fetcher(
        "Mutation",
        "increment",
        FnDataFetcher::new(|_| Ok(FetchedValue::value(1))),
    );

    let out = Execution::new()
        .execute(
            &doc,
            Some("Bump"),
            &Variables::new(),
            graphql_value!({}),
            context(schema, registry),
        )
        .await
        .expect("Execution failed");

    assert_eq!(out.data, graphql_value!({"increment": 1}));
}

#[test]
fn executes_synchronously() {
    let doc = query(vec![field("a"), field("b")]);
    let schema = SchemaType::new(
        ObjectMeta::new("Query")
            .field("a", Type::named("Int"))
            .field("b", Type::named("String")),
    );
    let registry = CodeRegistry::new().data_fetcher(
        "Query",
        "a",
        FnDataFetcher::new(|_| Ok(FetchedValue::future(async { Ok(FetchedValue::value(42)) }))),
    );

    let out = crate::execute_sync(
        &doc,
        None,
        &Variables::new(),
        graphql_value!({"b": "sync"}),
        context(schema, registry),
    )
    .expect("Execution failed");

    assert_eq!(out.errors, []);
    assert_eq!(out.data, graphql_value!({"a": 42, "b": "sync"}));
}
