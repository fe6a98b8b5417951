use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Utc;
use serde_json::json;
use storefront_payment_engine::{db_types::OrderStatus, NewOrderRequest};
use stripe_tools::webhook::{signature_header, SIGNATURE_HEADER};

use super::helpers::{engine, new_db, order_payload, seed_product, send_request, stock_of, TEST_WEBHOOK_SECRET};

fn succeeded_event(payment_intent_id: &str) -> String {
    json!({
        "id": "evt_test_1",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": payment_intent_id, "currency": "eur" } }
    })
    .to_string()
}

fn signed(payload: &str) -> TestRequest {
    let header = signature_header(TEST_WEBHOOK_SECRET, Utc::now().timestamp(), payload.as_bytes());
    TestRequest::post()
        .uri("/payment/webhook")
        .insert_header((SIGNATURE_HEADER, header))
        .set_payload(payload.to_string())
}

fn cart() -> NewOrderRequest {
    serde_json::from_value(order_payload(&[("p1", 2)])).expect("valid cart payload")
}

#[actix_web::test]
async fn webhook_without_signature_is_400() {
    let db = new_db().await;
    let req = TestRequest::post().uri("/payment/webhook").set_payload(succeeded_event("pi_1"));
    let (status, _body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_with_wrong_secret_is_400_and_unprocessed() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    let api = engine(&db);
    let order = api.place_order(cart()).await.expect("order");
    api.attach_payment_intent(&order.id, "pi_1").await.expect("attach");

    let payload = succeeded_event("pi_1");
    let header = signature_header("whsec_not_the_secret", Utc::now().timestamp(), payload.as_bytes());
    let req = TestRequest::post()
        .uri("/payment/webhook")
        .insert_header((SIGNATURE_HEADER, header))
        .set_payload(payload);
    let (status, _body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&db, "p1").await, 5);
}

#[actix_web::test]
async fn webhook_with_stale_timestamp_is_400() {
    let db = new_db().await;
    let payload = succeeded_event("pi_1");
    let header = signature_header(TEST_WEBHOOK_SECRET, Utc::now().timestamp() - 3600, payload.as_bytes());
    let req = TestRequest::post()
        .uri("/payment/webhook")
        .insert_header((SIGNATURE_HEADER, header))
        .set_payload(payload);
    let (status, _body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn signed_confirmation_completes_the_order_and_decrements_stock() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    let api = engine(&db);
    let order = api.place_order(cart()).await.expect("order");
    api.attach_payment_intent(&order.id, "pi_1").await.expect("attach");

    let (status, body) = send_request(&db, signed(&succeeded_event("pi_1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(stock_of(&db, "p1").await, 3);
    let order = api.fetch_order(&order.id).await.expect("order");
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.stock_updated);
}

#[actix_web::test]
async fn redelivered_confirmation_decrements_stock_only_once() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    let api = engine(&db);
    let order = api.place_order(cart()).await.expect("order");
    api.attach_payment_intent(&order.id, "pi_1").await.expect("attach");

    let (status, _) = send_request(&db, signed(&succeeded_event("pi_1"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send_request(&db, signed(&succeeded_event("pi_1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(stock_of(&db, "p1").await, 3);
}

#[actix_web::test]
async fn unknown_transaction_id_is_acknowledged_without_mutation() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;

    let (status, body) = send_request(&db, signed(&succeeded_event("pi_unmatched"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(stock_of(&db, "p1").await, 5);
}

#[actix_web::test]
async fn non_success_event_types_are_acknowledged_and_ignored() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    let api = engine(&db);
    let order = api.place_order(cart()).await.expect("order");
    api.attach_payment_intent(&order.id, "pi_1").await.expect("attach");

    let payload = json!({
        "id": "evt_test_2",
        "type": "payment_intent.created",
        "data": { "object": { "id": "pi_1" } }
    })
    .to_string();
    let (status, body) = send_request(&db, signed(&payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(stock_of(&db, "p1").await, 5);
    let order = api.fetch_order(&order.id).await.expect("order");
    assert_eq!(order.status, OrderStatus::Pending);
}

#[actix_web::test]
async fn create_payment_intent_for_unknown_order_is_404() {
    let db = new_db().await;
    let req = TestRequest::post()
        .uri("/payment/create-payment-intent")
        .set_json(json!({"orderId": "ffffffffffffffffffffffff"}));
    let (status, _body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn create_payment_intent_with_unreachable_processor_is_500() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    let order = engine(&db).place_order(cart()).await.expect("order");

    let req = TestRequest::post()
        .uri("/payment/create-payment-intent")
        .set_json(json!({"orderId": order.id.as_str()}));
    let (status, _body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
