//! Client tests against a recording mock transport.

use async_trait::async_trait;
use gqlc_sdk::{
    ClassRegistry, Client, ClientConfig, Connection, DecodedValue, Directive, DocumentBuilder,
    ErrorCode, FieldOptions, GraphModel, GraphQLError, GraphQLParams, GraphQLResponse, Model,
    OperationKind, SdkResult, SendOptions, Transport, TypeBundle, Value,
};
use serde_json::{json, Map, Value as JsonValue};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockTransport {
    responses: Mutex<VecDeque<GraphQLResponse>>,
    calls: Mutex<Vec<(GraphQLParams, HashMap<String, String>)>>,
}

impl MockTransport {
    fn with_responses(responses: impl IntoIterator<Item = GraphQLResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::default(),
        })
    }

    fn calls(&self) -> Vec<(GraphQLParams, HashMap<String, String>)> {
        self.calls.lock().unwrap().clone()
    }

    fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|(params, _)| params.query).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(
        &self,
        params: GraphQLParams,
        headers: &HashMap<String, String>,
    ) -> SdkResult<GraphQLResponse> {
        self.calls.lock().unwrap().push((params, headers.clone()));
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }
}

fn shop_bundle() -> Arc<TypeBundle> {
    Arc::new(
        TypeBundle::from_json_str(include_str!("../../../fixtures/shop_bundle.json")).unwrap(),
    )
}

fn data(value: JsonValue) -> GraphQLResponse {
    GraphQLResponse::data(value)
}

fn products_page(edges: &[(&str, &str, &str)], has_next_page: bool) -> GraphQLResponse {
    let edges: Vec<JsonValue> = edges
        .iter()
        .map(|(cursor, id, title)| json!({ "cursor": cursor, "node": { "id": id, "title": title } }))
        .collect();
    data(json!({
        "shop": {
            "products": {
                "edges": edges,
                "pageInfo": { "hasNextPage": has_next_page, "hasPreviousPage": false }
            }
        }
    }))
}

fn products_connection(root: &Arc<dyn GraphModel>) -> Connection {
    root.model()
        .drill(&["shop", "products"])
        .and_then(DecodedValue::as_connection)
        .cloned()
        .unwrap()
}

fn titles<'a>(nodes: impl IntoIterator<Item = &'a Arc<dyn GraphModel>>) -> Vec<String> {
    nodes
        .into_iter()
        .filter_map(|node| node.model().get("title").and_then(DecodedValue::as_str))
        .map(String::from)
        .collect()
}

#[tokio::test]
async fn test_send_decodes_response() {
    let transport = MockTransport::with_responses([data(json!({ "shop": { "name": "Hats" } }))]);
    let client = Client::new(shop_bundle(), transport.clone());

    let query = client
        .query(|root| root.add("shop", |shop| shop.add_field("name")))
        .unwrap();
    let response = client.send(&query, Map::new()).await.unwrap();
    assert!(!response.has_errors());

    let root = response.into_model().unwrap();
    assert_eq!(root.model().type_name(), "QueryRoot");
    assert_eq!(
        root.model().drill(&["shop", "name"]).and_then(DecodedValue::as_str),
        Some("Hats")
    );

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let (params, _) = &calls[0];
    assert_eq!(params.query, "query { shop { name } }");
    assert_eq!(params.variables, None);
    assert_eq!(params.operation_name, None);
}

#[tokio::test]
async fn test_send_mutation_with_variables() {
    let transport = MockTransport::with_responses([data(json!({
        "customerCreate": {
            "customer": { "id": "gid://shop/Customer/9", "email": "ada@example.com" },
            "userErrors": []
        }
    }))]);
    let client = Client::new(shop_bundle(), transport.clone());

    let mutation = client
        .operation(OperationKind::Mutation)
        .name("CreateCustomer")
        .variable("input", "CustomerCreateInput!")
        .build(|root| {
            root.add_with(
                "customerCreate",
                FieldOptions::new().arg("input", Value::variable("input")),
                |payload| {
                    payload.add("customer", |customer| customer.add_field("email"))?;
                    payload.add("userErrors", |error| {
                        error.add_field("field")?;
                        error.add_field("message")
                    })
                },
            )
        })
        .unwrap();

    let mut variables = Map::new();
    variables.insert("input".into(), json!({ "email": "ada@example.com" }));
    let root = client
        .send(&mutation, variables.clone())
        .await
        .unwrap()
        .into_model()
        .unwrap();

    let customer = root
        .model()
        .drill(&["customerCreate", "customer"])
        .and_then(DecodedValue::as_object)
        .unwrap();
    assert_eq!(customer.model().id(), Some("gid://shop/Customer/9"));
    assert_eq!(
        root.model()
            .drill(&["customerCreate", "userErrors"])
            .and_then(DecodedValue::as_list)
            .map(<[DecodedValue]>::len),
        Some(0)
    );

    let calls = transport.calls();
    let (params, _) = &calls[0];
    assert_eq!(
        params.query,
        "mutation CreateCustomer($input: CustomerCreateInput!) { customerCreate(input: $input) { customer { id email } userErrors { field message } } }"
    );
    assert_eq!(params.operation_name.as_deref(), Some("CreateCustomer"));
    assert_eq!(params.variables, Some(variables));
}

#[tokio::test]
async fn test_context_directive_and_headers() {
    let transport = MockTransport::with_responses([data(json!({ "shop": { "name": "Hats" } }))]);
    let config = ClientConfig::new()
        .header("Authorization", "Bearer token")
        .context_directive(Directive::new("inContext").arg("country", Value::enum_value("CA")));
    let client = Client::new(shop_bundle(), transport.clone()).with_config(config);

    let mut document = client.document();
    document
        .add_operation(
            client
                .operation(OperationKind::Query)
                .name("ShopName")
                .build(|root| root.add("shop", |shop| shop.add_field("name")))
                .unwrap(),
        )
        .unwrap();
    let document = document.build();

    client
        .send_document(
            &document,
            SendOptions::new()
                .header("X-Request-Id", "42")
                .extra("extensions", json!({ "trace": true })),
        )
        .await
        .unwrap();

    let calls = transport.calls();
    let (params, headers) = &calls[0];
    assert_eq!(
        params.query,
        "query ShopName @inContext(country: CA) { shop { name } }"
    );
    assert_eq!(params.operation_name.as_deref(), Some("ShopName"));
    assert_eq!(params.extra.get("extensions"), Some(&json!({ "trace": true })));
    assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer token"));
    assert_eq!(headers.get("X-Request-Id").map(String::as_str), Some("42"));
}

#[tokio::test]
async fn test_send_document_requires_operation_name_before_sending() {
    let bundle = shop_bundle();
    let transport = MockTransport::with_responses([data(json!({ "shop": { "name": "Hats" } }))]);
    let client = Client::new(bundle.clone(), transport.clone());

    let mut document = DocumentBuilder::new(&bundle);
    for name in ["A", "B"] {
        let operation = document
            .operation(OperationKind::Query)
            .name(name)
            .build(|root| root.add("shop", |shop| shop.add_field("name")))
            .unwrap();
        document.add_operation(operation).unwrap();
    }
    let document = document.build();

    let err = client
        .send_document(&document, SendOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoOperation);
    assert!(transport.calls().is_empty());

    let err = client
        .send_document(&document, SendOptions::new().operation_name("C"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoOperation);
    assert!(transport.calls().is_empty());

    let root = client
        .send_document(&document, SendOptions::new().operation_name("B"))
        .await
        .unwrap()
        .into_model()
        .unwrap();
    assert_eq!(root.model().operation().name.as_deref(), Some("B"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.operation_name.as_deref(), Some("B"));
    assert_eq!(
        calls[0].0.query,
        "query A { shop { name } }\nquery B { shop { name } }"
    );
}

#[tokio::test]
async fn test_fetch_all_pages_is_sequential() {
    let transport = MockTransport::with_responses([
        products_page(
            &[
                ("c1", "gid://shop/Product/1", "Bowler"),
                ("c2", "gid://shop/Product/2", "Fedora"),
            ],
            true,
        ),
        products_page(&[("c3", "gid://shop/Product/3", "Beret")], true),
        products_page(&[("c4", "gid://shop/Product/4", "Cloche")], false),
    ]);
    let client = Client::new(shop_bundle(), transport.clone());

    let query = client
        .query(|root| {
            root.add("shop", |shop| {
                shop.add_connection("products", FieldOptions::new().arg("first", 2), |product| {
                    product.add_field("title")
                })
            })
        })
        .unwrap();
    let root = client
        .send(&query, Map::new())
        .await
        .unwrap()
        .into_model()
        .unwrap();

    let products = products_connection(&root);
    let all = client.fetch_all_pages(&products).await.unwrap();
    assert_eq!(titles(&all), vec!["Bowler", "Fedora", "Beret", "Cloche"]);

    let queries = transport.queries();
    assert_eq!(queries.len(), 3);
    assert!(!queries[0].contains("after"));
    insta::assert_snapshot!(
        queries[1],
        @r#"query { shop { products(first: 2, after: "c2") { edges { cursor node { id title } } pageInfo { hasNextPage hasPreviousPage } } } }"#
    );
    assert!(queries[2].contains(r#"after: "c3""#));
}

#[tokio::test]
async fn test_fetch_all_pages_stops_on_last_page() {
    let transport = MockTransport::with_responses([products_page(
        &[("c1", "gid://shop/Product/1", "Bowler")],
        false,
    )]);
    let client = Client::new(shop_bundle(), transport.clone());
    let query = client
        .query(|root| {
            root.add("shop", |shop| {
                shop.add_connection("products", FieldOptions::new().arg("first", 1), |product| {
                    product.add_field("title")
                })
            })
        })
        .unwrap();
    let root = client
        .send(&query, Map::new())
        .await
        .unwrap()
        .into_model()
        .unwrap();

    let all = client
        .fetch_all_pages(&products_connection(&root))
        .await
        .unwrap();
    assert_eq!(titles(&all), vec!["Bowler"]);
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_fetch_next_page_surfaces_execution_errors() {
    let transport = MockTransport::with_responses([
        products_page(&[("c1", "gid://shop/Product/1", "Bowler")], true),
        GraphQLResponse {
            data: None,
            errors: Some(vec![GraphQLError::new("Throttled")]),
            extensions: None,
        },
    ]);
    let client = Client::new(shop_bundle(), transport.clone());
    let query = client
        .query(|root| {
            root.add("shop", |shop| {
                shop.add_connection("products", FieldOptions::new().arg("first", 1), |product| {
                    product.add_field("title")
                })
            })
        })
        .unwrap();
    let root = client
        .send(&query, Map::new())
        .await
        .unwrap()
        .into_model()
        .unwrap();

    let err = client
        .fetch_next_page(&products_connection(&root))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExecutionError);
    assert_eq!(err.message, "Throttled");
}

#[derive(Debug)]
struct ProductModel {
    inner: Model,
}

impl GraphModel for ProductModel {
    fn model(&self) -> &Model {
        &self.inner
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[tokio::test]
async fn test_refetch_through_node_field() {
    let transport = MockTransport::with_responses([
        products_page(&[("c1", "gid://shop/Product/1", "Bowler")], false),
        data(json!({
            "node": { "id": "gid://shop/Product/1", "__typename": "Product", "title": "Bowler (restocked)" }
        })),
        data(json!({ "node": null })),
    ]);
    let mut registry = ClassRegistry::new();
    registry.register("Product", |inner| Arc::new(ProductModel { inner }));
    let client = Client::new(shop_bundle(), transport.clone()).with_registry(registry);

    let query = client
        .query(|root| {
            root.add("shop", |shop| {
                shop.add_connection("products", FieldOptions::new().arg("first", 1), |product| {
                    product.add_field("title")
                })
            })
        })
        .unwrap();
    let root = client
        .send(&query, Map::new())
        .await
        .unwrap()
        .into_model()
        .unwrap();
    let products = products_connection(&root);
    let bowler = &products.nodes[0];
    assert!(bowler.downcast_ref::<ProductModel>().is_some());

    let refetched = client.refetch(bowler.model()).await.unwrap();
    assert!(refetched.downcast_ref::<ProductModel>().is_some());
    assert_eq!(refetched.model().type_name(), "Product");
    assert_eq!(
        refetched.model().get("title").and_then(DecodedValue::as_str),
        Some("Bowler (restocked)")
    );
    assert_eq!(
        transport.queries()[1],
        r#"query { node(id: "gid://shop/Product/1") { id __typename ... on Product { id title } } }"#
    );

    let err = client.refetch(bowler.model()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let shop = root
        .model()
        .get("shop")
        .and_then(DecodedValue::as_object)
        .unwrap();
    let err = client.refetch(shop.model()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RefetchError);
    assert_eq!(transport.calls().len(), 3);
}
