use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::{
    ExecutionAbort, ExecutionContext, GraphQLError, Variables,
    ast::{Definition, Field, Fragment, Operation, OperationType, OwnedDocument, Selection, Type},
    schema::{
        meta::{InterfaceMeta, ObjectMeta, UnionMeta},
        model::SchemaType,
    },
    value::Value,
};

fn schema() -> Arc<SchemaType> {
    Arc::new(
        SchemaType::new(
            ObjectMeta::new("Query")
                .field("pets", Type::list(Type::named("Pet")))
                .field("search", Type::list(Type::non_null_named("SearchResult")))
                .field("onlyCat", Type::named("CatOnly")),
        )
        .with_type(InterfaceMeta::new("Pet").field("name", Type::named("String")))
        .with_type(
            ObjectMeta::new("Dog")
                .field("name", Type::named("String"))
                .field("woofs", Type::named("Boolean"))
                .interfaces(["Pet"]),
        )
        .with_type(
            ObjectMeta::new("Cat")
                .field("name", Type::named("String"))
                .field("meows", Type::named("Boolean"))
                .interfaces(["Pet"]),
        )
        .with_type(UnionMeta::new("SearchResult", ["Dog", "Cat"]))
        .with_type(UnionMeta::new("CatOnly", ["Cat"])),
    )
}

fn field(name: &str) -> Selection {
    Selection::field(Field::new(name))
}

fn pet_fields() -> Vec<Selection> {
    vec![
        field("__typename"),
        field("name"),
        Selection::inline_fragment(Some("Dog"), vec![], vec![field("woofs")]),
        Selection::inline_fragment(Some("Cat"), vec![], vec![field("meows")]),
    ]
}

fn animals() -> Value {
    graphql_value!([
        {"__typename": "Dog", "name": "Odie", "woofs": true},
        {"__typename": "Cat", "name": "Garfield", "meows": false},
    ])
}

async fn run(doc: OwnedDocument, root_value: Value) -> Result<Value, GraphQLError> {
    let out = crate::execute(
        &doc,
        None,
        &Variables::new(),
        root_value,
        ExecutionContext::builder(schema()),
    )
    .await?;
    assert_eq!(out.errors, []);
    Ok(out.data)
}

fn query(selections: Vec<Selection>) -> OwnedDocument {
    vec![Definition::Operation(Operation::new(OperationType::Query, selections))]
}

#[tokio::test]
async fn interface_resolves_to_concrete_types() {
    let doc = query(vec![Selection::field(
        Field::new("pets").selection_set(pet_fields()),
    )]);
    let mut root = crate::Object::with_capacity(1);
    root.add_field("pets", animals());

    let data = run(doc, Value::object(root)).await.expect("Execution failed");

    assert_eq!(
        data,
        graphql_value!({"pets": [
            {"__typename": "Dog", "name": "Odie", "woofs": true},
            {"__typename": "Cat", "name": "Garfield", "meows": false},
        ]}),
    );
}

#[tokio::test]
async fn union_through_named_fragment() {
    let doc = vec![
        Definition::Operation(Operation::new(
            OperationType::Query,
            vec![Selection::field(Field::new("search").selection_set(vec![
                field("__typename"),
                Selection::fragment_spread("CatFields", vec![]),
            ]))],
        )),
        Definition::Fragment(Arc::new(Fragment::new(
            "CatFields",
            "Cat",
            vec![field("name")],
        ))),
    ];
    let mut root = crate::Object::with_capacity(1);
    root.add_field("search", animals());

    let data = run(doc, Value::object(root)).await.expect("Execution failed");

    assert_eq!(
        data,
        graphql_value!({"search": [
            {"__typename": "Dog"},
            {"__typename": "Cat", "name": "Garfield"},
        ]}),
    );
}

#[tokio::test]
async fn single_member_union_needs_no_typename() {
    let doc = query(vec![Selection::field(
        Field::new("onlyCat").selection_set(vec![field("__typename"), field("name")]),
    )]);

    let data = run(doc, graphql_value!({"onlyCat": {"name": "Tom"}}))
        .await
        .expect("Execution failed");

    assert_eq!(
        data,
        graphql_value!({"onlyCat": {"__typename": "Cat", "name": "Tom"}}),
    );
}

#[tokio::test]
async fn unresolvable_abstract_type_aborts() {
    let doc = query(vec![Selection::field(
        Field::new("pets").selection_set(vec![field("name")]),
    )]);

    let res = run(doc, graphql_value!({"pets": [{"name": "Nemo"}]})).await;

    assert_eq!(
        res,
        Err(GraphQLError::Aborted(ExecutionAbort::UnresolvedAbstractType(
            "Pet".into(),
        ))),
    );
}
