use std::path::PathBuf;

use serde_json::json;
use zeroapi_json::{convert, parse_file, parse_source, Error, JsonStyle, NormalizedSpec};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn normalize_fixture(name: &str) -> NormalizedSpec {
    let document = parse_file(fixture(name)).expect("fixture parses");
    convert(&document)
}

#[test]
fn order_fixture_info_and_imports() {
    let spec = normalize_fixture("order.api");
    assert_eq!(spec.syntax, "v1");

    let info = &spec.info;
    assert_eq!(info.title, "Order Service");
    assert_eq!(info.description, "order management");
    assert_eq!(info.author, "shop team");
    assert_eq!(info.date, "2024-05-01");
    assert_eq!(info.version, "v2");
    assert_eq!(info.email, "shop@example.com");
    assert_eq!(info.properties.len(), 7);
    assert_eq!(info.properties["x-owner"], "payments");

    assert_eq!(spec.imports.len(), 1);
    assert_eq!(spec.imports[0].value, "common/page.api");
}

#[test]
fn order_fixture_types_skip_aliases() {
    let spec = normalize_fixture("order.api");
    let names: Vec<&str> = spec.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Order", "OrderItem", "GetOrderReq", "CreateOrderReq"]);

    let order = serde_json::to_value(&spec.types[0]).unwrap();
    assert_eq!(
        order,
        json!({
            "name": "Order",
            "raw_name": "Order",
            "docs": ["// Order is a placed order."],
            "fields": [
                {"name": "Id", "type": "int64", "tag": "`json:\"id\"`", "is_inline": false, "optional": false},
                {"name": "Items", "type": "[]*OrderItem", "tag": "`json:\"items\"`", "comment": "// line items", "is_inline": false, "optional": false},
                {"name": "Extra", "type": "map[string]any", "tag": "`json:\"extra,optional\"`", "is_inline": false, "optional": true},
                {"name": "Created", "type": "int64", "tag": "`json:\"created_at\"`", "is_inline": false, "optional": false},
                {"name": "", "type": "PageInfo", "is_inline": true, "optional": false}
            ]
        })
    );

    let create = &spec.types[3];
    assert_eq!(create.fields[1].name, "Note");
    assert_eq!(create.fields[1].docs, vec!["// free text shown on the receipt"]);
    assert!(create.fields[1].optional);
}

#[test]
fn order_fixture_service_flattens_groups() {
    let spec = normalize_fixture("order.api");
    assert_eq!(spec.services.len(), 1);
    let service = &spec.services[0];
    assert_eq!(service.name, "order-api");

    let handlers: Vec<&str> = service.routes.iter().map(|r| r.handler.as_str()).collect();
    assert_eq!(handlers, vec!["GetOrder", "CreateOrder", "ListOrders", "PurgeOrders", "Health"]);

    // second group's annotation replaced the first one
    let server = serde_json::to_value(&service.server).unwrap();
    assert_eq!(
        server,
        json!({"group": "admin", "prefix": "/admin", "auth": "AdminAuth", "middleware": [], "timeout": ""})
    );

    let get = serde_json::to_value(&service.routes[0]).unwrap();
    assert_eq!(
        get,
        json!({
            "handler": "GetOrder",
            "method": "get",
            "path": "/orders/:id",
            "request_type": "GetOrderReq",
            "response_type": "Order",
            "doc": {"summary": "fetch an order"}
        })
    );

    let create = &service.routes[1];
    assert_eq!(create.docs, vec!["// creates a new order"]);
    assert_eq!(serde_json::to_value(&create.doc).unwrap(), json!({"summary": "create order", "tag": "orders"}));

    let list = &service.routes[2];
    assert_eq!(list.request_type, "");
    assert_eq!(list.response_type, "[]Order");

    let purge = &service.routes[3];
    assert_eq!(purge.method, "delete");
    assert_eq!(purge.response_type, "");

    let health = &service.routes[4];
    assert_eq!(health.at_server_annotation["handler"], "Health");
    assert_eq!(health.at_server_annotation["timeout"], "1s");
}

#[test]
fn first_group_server_when_only_it_is_annotated() {
    let src = r#"
@server (
    group: order
    jwt: Auth
    middleware: RateLimit, Audit
)
service demo {
    @handler A
    get /a
    @handler B
    get /b
}

service demo {
    @handler C
    get /c
    @handler D
    get /d
    @handler E
    get /e
}
"#;
    let spec = convert(&parse_source(src, "inline.api").unwrap());
    let service = &spec.services[0];
    assert_eq!(service.routes.len(), 5);
    assert_eq!(service.server.group, "order");
    assert_eq!(service.server.auth, "Auth");
    assert_eq!(service.server.middleware, vec!["RateLimit", "Audit"]);
}

#[test]
fn document_without_info_falls_back_to_empty_legacy_fields() {
    let spec = normalize_fixture("minimal.api");
    let info = serde_json::to_value(&spec.info).unwrap();
    assert_eq!(
        info,
        json!({"title": "", "desc": "", "author": "", "date": "", "version": "", "email": "", "properties": {}})
    );
    assert_eq!(spec.syntax, "");
    assert!(spec.types.is_empty());
    assert_eq!(spec.services[0].routes.len(), 1);
}

#[test]
fn normalized_output_round_trips_through_json() {
    let spec = normalize_fixture("order.api");
    let text = spec.to_json(JsonStyle::Pretty).unwrap();
    assert_eq!(NormalizedSpec::from_json(&text).unwrap(), spec);

    let compact = spec.to_json(JsonStyle::Compact).unwrap();
    assert_eq!(NormalizedSpec::from_json(&compact).unwrap(), spec);
}

#[test]
fn broken_fixture_reports_location() {
    match parse_file(fixture("broken.api")) {
        Err(Error::Parse { file, line, column, message }) => {
            assert!(file.ends_with("broken.api"), "{file}");
            assert_eq!((line, column), (4, 11));
            assert!(message.contains("unterminated struct tag"), "{message}");
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}
