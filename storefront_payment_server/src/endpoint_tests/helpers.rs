use actix_web::{dev::Service, http::StatusCode, test, test::TestRequest, web, App};
use serde_json::Value;
use spg_common::{Cents, Secret};
use storefront_payment_engine::{
    db_types::{NewProduct, ProductId},
    traits::StorefrontDatabase,
    OrderFlowApi,
    SqliteDatabase,
};
use stripe_tools::{StripeApi, StripeApiConfig};

use crate::{
    mailer::SmtpNotifier,
    middleware::SignatureMiddlewareFactory,
    routes::{health, CreateOrderRoute, CreatePaymentIntentRoute, PaymentWebhookRoute, UpdateOrderRoute},
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_endpoint_test";

/// Fresh file-backed SQLite store with migrations applied. File-backed so that every pooled connection sees
/// the same database.
pub async fn new_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let path = std::env::temp_dir().join(format!("spg_server_test_{}.db", rand::random::<u64>()));
    let db = SqliteDatabase::new_with_url(&format!("sqlite://{}", path.display()), 5)
        .await
        .expect("could not open test database");
    db.run_migrations().await.expect("could not run migrations");
    db
}

/// Engine handle for seeding and inspecting state outside the HTTP surface.
pub fn engine(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase, SmtpNotifier> {
    OrderFlowApi::new(db.clone(), SmtpNotifier::from_config(None))
}

pub async fn seed_product(db: &SqliteDatabase, id: &str, name: &str, price: i64, stock: i64) {
    db.upsert_product(NewProduct { id: ProductId::from(id), name: name.into(), price: Cents::from(price), stock })
        .await
        .expect("could not seed product");
}

pub async fn stock_of(db: &SqliteDatabase, id: &str) -> i64 {
    db.fetch_product(&ProductId::from(id)).await.expect("fetch_product failed").expect("product should exist").stock
}

/// Run one request against a fully wired app (all routes, signature middleware on the webhook scope, mail
/// disabled, processor pointed at a dead endpoint).
///
/// Middleware rejections surface as `Err` from the service rather than as a response, so the error path is
/// rendered into a response here instead of going through `call_service` (which would panic).
pub async fn send_request(db: &SqliteDatabase, req: TestRequest) -> (StatusCode, Value) {
    let db = db.clone();
    let app = test::init_service(App::new().configure(move |cfg| {
        let api = OrderFlowApi::new(db.clone(), SmtpNotifier::from_config(None));
        // Nothing listens here; processor-dependent endpoints fail with 500, which is what the tests expect.
        let stripe_api = StripeApi::new(
            StripeApiConfig::new(Secret::new("sk_test_dummy".to_string())).with_api_base("http://127.0.0.1:9"),
        )
        .expect("stripe client");
        let webhook_scope = web::scope("/payment/webhook")
            .wrap(SignatureMiddlewareFactory::new(Secret::new(TEST_WEBHOOK_SECRET.to_string()), 300))
            .service(PaymentWebhookRoute::<SqliteDatabase, SmtpNotifier>::new());
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(stripe_api))
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase, SmtpNotifier>::new())
            .service(UpdateOrderRoute::<SqliteDatabase, SmtpNotifier>::new())
            .service(CreatePaymentIntentRoute::<SqliteDatabase, SmtpNotifier>::new())
            .service(webhook_scope);
    }))
    .await;
    match app.call(req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = actix_web::body::to_bytes(res.into_body()).await.unwrap_or_default();
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        },
    }
}

pub fn order_payload(items: &[(&str, i64)]) -> Value {
    serde_json::json!({
        "items": items.iter().map(|(id, qty)| serde_json::json!({"productId": id, "quantity": qty})).collect::<Vec<_>>(),
        "shippingAddress": {
            "name": "A. Customer",
            "street": "Main St 1",
            "postalCode": "10115",
            "city": "Berlin",
            "country": "DE",
            "email": "customer@example.com"
        },
        "customerEmail": "customer@example.com"
    })
}
