//! In-process tests of the REST surface.
//!
//! The router is driven with `tower::ServiceExt::oneshot` over an in-memory
//! database; no socket is bound.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use engine::Engine;
use migration::MigratorTrait;

const EPS: f64 = 1e-4;

async fn make_router() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    server::router(Arc::new(engine), Duration::from_secs(10))
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn created_id(body: &Value) -> String {
    assert_eq!(body["status"], "created");
    body["created_id"].as_str().unwrap().to_string()
}

async fn add_member(router: &Router, name: &str) -> String {
    let (status, body) = call(
        router,
        "POST",
        "/members",
        Some(json!({ "name": name, "email": format!("{}@example.org", name.to_lowercase()) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    created_id(&body)
}

async fn add_wanted(router: &Router, name: &str, quantity: i32, unit_price: f64) -> String {
    let (status, body) = call(
        router,
        "POST",
        "/items/wanted",
        Some(json!({ "name": name, "quantity": quantity, "unit_price": unit_price })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    created_id(&body)
}

#[tokio::test]
async fn purchase_flow_updates_ledger_and_pending_pool() {
    let router = make_router().await;
    let alice = add_member(&router, "Alice").await;
    let bob = add_member(&router, "Bob").await;
    let milk = add_wanted(&router, "Milk", 2, 15.0).await;
    let bread = add_wanted(&router, "Bread", 1, 10.0).await;

    let (status, pending) = call(&router, "GET", "/items/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 2);

    let (status, body) = call(
        &router,
        "POST",
        "/purchases",
        Some(json!({
            "member_id": alice,
            "date_purchased": "2025-02-07",
            "item_ids": [milk, bread],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let purchase = created_id(&body);

    let (status, ledger) = call(&router, "GET", "/ledger", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!((ledger["total_spent"].as_f64().unwrap() - 40.0).abs() < EPS);
    assert!((ledger["fair_share"].as_f64().unwrap() - 20.0).abs() < EPS);

    let (status, balance) = call(&router, "GET", &format!("/ledger/{bob}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!((balance["amount_owed"].as_f64().unwrap() - 20.0).abs() < EPS);

    let (_, history) = call(&router, "GET", &format!("/purchases/{purchase}"), None).await;
    assert_eq!(history["payer_name"], "Alice");
    assert_eq!(history["item_names"], json!(["Bread", "Milk"]));

    let (_, items) = call(&router, "GET", &format!("/members/{alice}/items"), None).await;
    assert_eq!(items["items"], json!(["Bread", "Milk"]));

    let (_, item) = call(&router, "GET", &format!("/items/{milk}"), None).await;
    assert_eq!(item["link"]["status"], "bought");
    assert_eq!(item["link"]["payer_name"], "Alice");

    let (status, body) = call(&router, "DELETE", &format!("/purchases/{purchase}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");

    let (_, pending) = call(&router, "GET", "/items/pending", None).await;
    assert_eq!(pending.as_array().unwrap().len(), 2);

    let (status, body) = call(&router, "GET", &format!("/purchases/{purchase}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");
}

#[tokio::test]
async fn errors_use_the_envelope() {
    let router = make_router().await;

    let (status, body) = call(&router, "GET", "/ledger", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");

    let (status, body) = call(&router, "GET", "/members/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
    assert!(!body["messages"].as_array().unwrap().is_empty());

    let alice = add_member(&router, "Alice").await;
    let (status, body) = call(
        &router,
        "PUT",
        &format!("/members/{alice}"),
        Some(json!({ "id": Uuid::new_v4(), "name": "Alice", "email": "alice@example.org" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");

    let (status, body) = call(
        &router,
        "PUT",
        &format!("/members/{alice}"),
        Some(json!({ "id": alice, "name": "Alice", "email": "alice@home.org" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "updated");

    let (status, _) = call(
        &router,
        "POST",
        "/members",
        Some(json!({ "name": "Copy", "email": "ALICE@home.org" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn link_and_unlink_through_purchase_routes() {
    let router = make_router().await;
    let alice = add_member(&router, "Alice").await;
    let rice = add_wanted(&router, "Rice", 1, 3.0).await;

    let (status, body) = call(
        &router,
        "POST",
        "/purchases",
        Some(json!({ "member_id": alice, "date_purchased": "2025-04-02" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let purchase = created_id(&body);

    let uri = format!("/purchases/{purchase}/items/{rice}");
    let (status, body) = call(&router, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let link = created_id(&body);

    let (status, _) = call(&router, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, view) = call(&router, "GET", &format!("/links/{link}"), None).await;
    assert_eq!(view["is_bought"], true);
    assert_eq!(view["purchase_id"], purchase);

    let (status, body) = call(&router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");

    let (status, _) = call(&router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &router,
        "POST",
        "/links",
        Some(json!({ "grocery_item_id": rice })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let pending = created_id(&body);

    let (_, links) = call(&router, "GET", "/links", None).await;
    assert_eq!(links.as_array().unwrap().len(), 1);
    assert_eq!(links[0]["id"], pending);
    assert_eq!(links[0]["is_bought"], false);
}

#[tokio::test]
async fn purchase_history_is_paged() {
    let router = make_router().await;
    let alice = add_member(&router, "Alice").await;
    for day in 1..=3 {
        let (status, _) = call(
            &router,
            "POST",
            "/purchases",
            Some(json!({ "member_id": alice, "date_purchased": format!("2025-05-0{day}") })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = call(&router, "GET", "/purchases/page?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["purchases"].as_array().unwrap().len(), 2);
    assert_eq!(page["purchases"][0]["date_purchased"], "2025-05-03");
    let cursor = page["next_cursor"].as_str().unwrap().to_string();

    let (_, page) = call(
        &router,
        "GET",
        &format!("/purchases/page?limit=2&cursor={cursor}"),
        None,
    )
    .await;
    assert_eq!(page["purchases"].as_array().unwrap().len(), 1);
    assert_eq!(page["purchases"][0]["date_purchased"], "2025-05-01");
    assert!(page["next_cursor"].is_null());

    let (status, body) = call(&router, "GET", "/purchases/page?cursor=garbage!", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
}

async fn call_raw(router: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn rejected_bodies_and_queries_use_the_envelope() {
    let router = make_router().await;

    let (status, body) = call(&router, "POST", "/members", Some(json!({ "name": "A" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
    assert!(
        body["messages"][0]
            .as_str()
            .unwrap()
            .contains("missing field `email`")
    );

    let (status, body) = call_raw(&router, "POST", "/members", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let req = Request::builder()
        .method("POST")
        .uri("/items/wanted")
        .body(Body::from(r#"{"name":"Milk","quantity":1,"unit_price":1.0}"#))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "error");

    let (status, body) = call(&router, "GET", "/purchases/page?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(!body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn purchase_with_empty_item_list_is_rejected() {
    let router = make_router().await;
    let alice = add_member(&router, "Alice").await;

    let (status, body) = call(
        &router,
        "POST",
        "/purchases",
        Some(json!({ "member_id": alice, "date_purchased": "2025-06-01", "item_ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");

    let (_, purchases) = call(&router, "GET", "/purchases", None).await;
    assert!(purchases.as_array().unwrap().is_empty());

    let (status, body) = call(
        &router,
        "POST",
        "/purchases",
        Some(json!({ "member_id": alice, "date_purchased": "2025-06-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let purchase = created_id(&body);
    let (_, history) = call(&router, "GET", &format!("/purchases/{purchase}"), None).await;
    assert_eq!(history["item_names"], json!([]));
}
