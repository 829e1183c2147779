use std::sync::Arc;

use adslot::store::InMemoryStore;
use adslot_api::construct_router;
use adslot_api::state::State;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let config = State::default_config().unwrap();
    let state = State::new(Arc::new(InMemoryStore::new()), config);
    construct_router(Arc::new(state))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn open_slot(app: &Router) -> String {
    let (status, channel) = call(
        app,
        Method::POST,
        "/api/v1/channels",
        Some(json!({
            "external_id": "-100900",
            "title": "Crypto Daily",
            "category": "crypto",
            "prices": { "1/24": 10000, "native": 25000 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, slot) = call(
        app,
        Method::POST,
        "/api/v1/slots",
        Some(json!({
            "channel_id": channel["id"],
            "date": "2099-01-15",
            "time": "12:00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    slot["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_store_backend() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/health/store", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn pricing_recommendation_uses_category_table() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::GET,
        "/api/v1/pricing/recommend?reach=4000&category=crypto&err_percent=25&format=native",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // 4000 * 2500 / 1000 = 10000, +20% engagement, x2.5 native
    assert_eq!(body["price"], 30000);

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/v1/pricing/recommend?reach=-1&category=crypto",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn second_reservation_is_a_conflict() {
    let app = app();
    let slot_id = open_slot(&app).await;
    let reserve = format!("/api/v1/slots/{}/reserve", slot_id);

    let (status, slot) = call(&app, Method::POST, &reserve, Some(json!({ "holder_id": "a" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slot["status"], "reserved");

    let (status, body) = call(&app, Method::POST, &reserve, Some(json!({ "holder_id": "b" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_RESERVED");
}

#[tokio::test]
async fn order_lifecycle_awards_manager() {
    let app = app();
    let slot_id = open_slot(&app).await;

    let (_, client) = call(
        &app,
        Method::POST,
        "/api/v1/clients",
        Some(json!({ "telegram_id": 11, "name": "Buyer" })),
    )
    .await;
    let (_, manager) = call(
        &app,
        Method::POST,
        "/api/v1/managers",
        Some(json!({ "telegram_id": 22, "name": "Seller" })),
    )
    .await;
    let manager_id = manager["id"].as_str().unwrap().to_string();
    call(
        &app,
        Method::PUT,
        &format!("/api/v1/managers/{}/status", manager_id),
        Some(json!({ "status": "active" })),
    )
    .await;

    call(
        &app,
        Method::POST,
        &format!("/api/v1/slots/{}/reserve", slot_id),
        Some(json!({ "holder_id": client["id"] })),
    )
    .await;
    let (status, order) = call(
        &app,
        Method::POST,
        "/api/v1/orders",
        Some(json!({
            "slot_id": slot_id,
            "client_id": client["id"],
            "manager_id": manager_id,
            "format": "native",
            "discount_percent": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["final_price"], 25000);

    let transition = format!("/api/v1/orders/{}/transition", order["id"].as_str().unwrap());
    let mut last = Value::Null;
    for next in ["payment_uploaded", "payment_confirmed", "posted", "completed"] {
        let (status, outcome) =
            call(&app, Method::POST, &transition, Some(json!({ "status": next }))).await;
        assert_eq!(status, StatusCode::OK);
        last = outcome;
    }
    assert_eq!(last["changed"], true);
    assert_eq!(last["award"]["xp_gained"], 260);
    assert_eq!(last["award"]["new_level"], 2);

    let (status, body) =
        call(&app, Method::POST, &transition, Some(json!({ "status": "cancelled" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    let (_, board) = call(
        &app,
        Method::GET,
        "/api/v1/managers/leaderboard?metric=revenue",
        None,
    )
    .await;
    assert_eq!(board[0]["manager_id"], manager_id.as_str());
    assert_eq!(board[0]["value"], 25000);
}

#[tokio::test]
async fn unknown_records_are_not_found() {
    let app = app();
    let (status, _) = call(&app, Method::GET, "/api/v1/orders/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::POST, "/api/v1/payouts/missing/approve", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assistant_requires_configuration() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/assistant/session-1",
        Some(json!({ "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}
