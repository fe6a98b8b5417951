use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{engine, new_db, order_payload, seed_product, send_request, stock_of};

#[actix_web::test]
async fn create_order_returns_201_with_catalog_priced_total() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    seed_product(&db, "p2", "Pine stool", 2550, 3).await;

    let req = TestRequest::post().uri("/orders").set_json(order_payload(&[("p1", 2), ("p2", 1)]));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total"], 4550);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["stockUpdated"], false);
    assert_eq!(body["items"][0]["productId"], "p1");
    assert_eq!(body["items"][0]["quantity"], 2);
    assert!(body["paymentIntentId"].is_null());
    // Creation does not reserve stock.
    assert_eq!(stock_of(&db, "p1").await, 5);
}

#[actix_web::test]
async fn create_order_with_empty_cart_is_400() {
    let db = new_db().await;
    let req = TestRequest::post().uri("/orders").set_json(json!({
        "items": [],
        "shippingAddress": order_payload(&[])["shippingAddress"],
        "customerEmail": "customer@example.com"
    }));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Order must contain at least one item");
}

#[actix_web::test]
async fn create_order_with_missing_postal_code_is_400() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    let mut payload = order_payload(&[("p1", 1)]);
    payload["shippingAddress"].as_object_mut().unwrap().remove("postalCode");

    let (status, body) = send_request(&db, TestRequest::post().uri("/orders").set_json(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All shipping address fields are required");
}

#[actix_web::test]
async fn create_order_over_stock_is_400_and_persists_nothing() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;

    let req = TestRequest::post().uri("/orders").set_json(order_payload(&[("p1", 6)]));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient stock for Oak shelf");

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.expect("count query");
    assert_eq!(count, 0);
}

#[actix_web::test]
async fn patch_unknown_order_is_404() {
    let db = new_db().await;
    let req = TestRequest::patch()
        .uri("/orders/ffffffffffffffffffffffff")
        .set_json(json!({"paymentIntentId": "pi_x"}));
    let (status, _body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn patch_sets_payment_intent_and_status() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    let order = engine(&db).place_order(cart()).await.expect("order");

    let req = TestRequest::patch()
        .uri(&format!("/orders/{}", order.id.as_str()))
        .set_json(json!({"paymentIntentId": "pi_patch", "status": "completed"}));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentIntentId"], "pi_patch");
    assert_eq!(body["status"], "completed");
}

#[actix_web::test]
async fn patch_with_unknown_status_is_400() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    let order = engine(&db).place_order(cart()).await.expect("order");

    let req = TestRequest::patch()
        .uri(&format!("/orders/{}", order.id.as_str()))
        .set_json(json!({"status": "shipped"}));
    let (status, body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid order status: shipped");
}

#[actix_web::test]
async fn patch_with_no_fields_is_400() {
    let db = new_db().await;
    seed_product(&db, "p1", "Oak shelf", 1000, 5).await;
    let order = engine(&db).place_order(cart()).await.expect("order");

    let req = TestRequest::patch().uri(&format!("/orders/{}", order.id.as_str())).set_json(json!({}));
    let (status, _body) = send_request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn cart() -> storefront_payment_engine::NewOrderRequest {
    serde_json::from_value(super::helpers::order_payload(&[("p1", 1)])).expect("valid cart payload")
}
