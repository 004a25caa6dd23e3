//! End-to-end REST scenarios driven through the gateway.
//!
//! These exercise the full stack - router, store, query engine, codec,
//! persistence backend - without sockets; the socket path has its own
//! suite in `http_server.rs`.

use dynamickv::{Gateway, Method, MemoryBackend, Request, Response, SequentialIds, Store};
use std::sync::Arc;

fn gateway() -> Gateway {
    let store = Store::open(
        Arc::new(MemoryBackend::new()),
        Arc::new(SequentialIds::new()),
    )
    .unwrap();
    Gateway::new(Arc::new(store), "products")
}

fn get(gateway: &Gateway, target: &str) -> Response {
    gateway.handle(&Request::new(Method::Get, target, Vec::new()))
}

fn post(gateway: &Gateway, target: &str, body: serde_json::Value) -> Response {
    gateway.handle(&Request::new(
        Method::Post,
        target,
        serde_json::to_vec(&body).unwrap(),
    ))
}

fn put(gateway: &Gateway, target: &str, body: serde_json::Value) -> Response {
    gateway.handle(&Request::new(
        Method::Put,
        target,
        serde_json::to_vec(&body).unwrap(),
    ))
}

fn delete(gateway: &Gateway, target: &str) -> Response {
    gateway.handle(&Request::new(Method::Delete, target, Vec::new()))
}

#[test]
fn full_product_lifecycle() {
    let g = gateway();

    // Create
    let created = post(
        &g,
        "/api/products",
        serde_json::json!({"name": "Widget", "price": 9.99}),
    );
    assert_eq!(created.status, 201);
    let created = created.body_json().unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(created["createdAt"], created["updatedAt"]);

    // Read back identically
    let fetched = get(&g, &format!("/api/products/{}", id));
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.body_json().unwrap(), created);

    // Partial update preserves omitted fields, advances updatedAt
    let updated = put(
        &g,
        &format!("/api/products/{}", id),
        serde_json::json!({"price": 12.5}),
    );
    assert_eq!(updated.status, 200);
    let updated = updated.body_json().unwrap();
    assert_eq!(updated["price"], 12.5);
    assert_eq!(updated["name"], "Widget");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert!(
        updated["updatedAt"].as_str().unwrap() > created["updatedAt"].as_str().unwrap(),
        "updatedAt must strictly advance"
    );

    // Range query picks up the new price
    let in_range = get(&g, "/api/products/price/10/20").body_json().unwrap();
    assert!(in_range
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["id"] == id.as_str()));

    // Substring search over the name field, case-insensitive
    let hits = get(&g, "/api/search?q=widg").body_json().unwrap();
    assert!(hits.as_array().unwrap().iter().any(|r| r["id"] == id.as_str()));

    // Delete, then the id is gone
    let deleted = delete(&g, &format!("/api/products/{}", id));
    assert_eq!(deleted.status, 200);
    assert_eq!(
        deleted.body_json().unwrap(),
        serde_json::json!({"deleted": true})
    );
    assert_eq!(get(&g, &format!("/api/products/{}", id)).status, 404);
    assert_eq!(delete(&g, &format!("/api/products/{}", id)).status, 404);
}

#[test]
fn collections_are_independent() {
    let g = gateway();
    post(&g, "/api/products", serde_json::json!({"name": "Widget"}));
    post(
        &g,
        "/api/users",
        serde_json::json!({"username": "john_doe", "email": "john@example.com"}),
    );

    let products = get(&g, "/api/products").body_json().unwrap();
    let users = get(&g, "/api/users").body_json().unwrap();
    assert_eq!(products.as_array().unwrap().len(), 1);
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["username"], "john_doe");

    // Ids live in their collection's namespace: a product id is not a user
    let product_id = products[0]["id"].as_str().unwrap();
    assert_eq!(get(&g, &format!("/api/users/{}", product_id)).status, 404);
}

#[test]
fn range_bounds_are_inclusive() {
    let g = gateway();
    post(&g, "/api/products", serde_json::json!({"name": "Exact", "price": 10}));

    let at_bound = get(&g, "/api/products/price/10/10").body_json().unwrap();
    assert_eq!(at_bound.as_array().unwrap().len(), 1);

    let above = get(&g, "/api/products/price/11/20").body_json().unwrap();
    assert!(above.as_array().unwrap().is_empty());
}

#[test]
fn search_matches_original_seed_catalog() {
    // The catalog the store was first exercised with
    let g = gateway();
    for (name, price) in [
        ("iPhone 14", 999.99),
        ("Samsung Galaxy S23", 899.99),
        ("AirPods Pro", 249.99),
    ] {
        let response = post(
            &g,
            "/api/products",
            serde_json::json!({
                "name": name,
                "price": price,
                "description": format!("{} description", name),
            }),
        );
        assert_eq!(response.status, 201);
    }

    let hits = get(&g, "/api/search?q=iphone").body_json().unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], "iPhone 14");

    let mid_range = get(&g, "/api/products/price/200/500").body_json().unwrap();
    let names: Vec<&str> = mid_range
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["AirPods Pro"]);
}

#[test]
fn errors_have_message_shape() {
    let g = gateway();
    for response in [
        get(&g, "/api/products/absent"),
        get(&g, "/api/search"),
        get(&g, "/api/products/price/zz/10"),
        get(&g, "/api/products/price/20/10"),
        post(&g, "/api/products", serde_json::json!("not an object")),
    ] {
        assert!(response.status == 400 || response.status == 404);
        let body = response.body_json().unwrap();
        assert!(body["message"].is_string(), "error body: {}", body);
    }
}

#[test]
fn generated_ids_are_unique_under_load() {
    use dynamickv::TimeRandomIds;
    let store = Store::open(Arc::new(MemoryBackend::new()), Arc::new(TimeRandomIds)).unwrap();
    let g = Gateway::new(Arc::new(store), "products");

    let mut seen = std::collections::HashSet::new();
    for _ in 0..500 {
        let body = post(&g, "/api/products", serde_json::json!({})).body_json().unwrap();
        assert!(seen.insert(body["id"].as_str().unwrap().to_string()));
    }
}
