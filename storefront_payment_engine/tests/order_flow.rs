//! End-to-end tests of the order lifecycle against a real SQLite store: creation, validation rejections,
//! payment-intent bookkeeping, and the idempotent reconciliation flow.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anyhow::Result;
use spg_common::Cents;
use storefront_payment_engine::{
    db_types::{NewProduct, OrderId, OrderStatus, ProductId, ShippingAddress},
    traits::{NotifyError, OrderConfirmation, OrderNotifier, StorefrontDatabase, StorefrontError},
    CartItem,
    ModifyOrderRequest,
    NewOrderRequest,
    OrderFlowApi,
    OrderFlowError,
    OrderValidationError,
    ReconciliationStatus,
    SqliteDatabase,
};

/// Notifier double that counts deliveries, so tests can assert notifications fire exactly once per fulfilment.
#[derive(Clone, Default)]
struct RecordingNotifier {
    customer: Arc<AtomicUsize>,
    office: Arc<AtomicUsize>,
}

impl OrderNotifier for RecordingNotifier {
    async fn send_customer_confirmation(&self, _confirmation: &OrderConfirmation) -> Result<(), NotifyError> {
        self.customer.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_office_notification(&self, _confirmation: &OrderConfirmation) -> Result<(), NotifyError> {
        self.office.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn random_db_url() -> String {
    let path = std::env::temp_dir().join(format!("storefront_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

async fn new_api() -> Result<(OrderFlowApi<SqliteDatabase, RecordingNotifier>, RecordingNotifier)> {
    let _ = env_logger::try_init();
    let db = SqliteDatabase::new_with_url(&random_db_url(), 5).await?;
    db.run_migrations().await?;
    let notifier = RecordingNotifier::default();
    Ok((OrderFlowApi::new(db, notifier.clone()), notifier))
}

async fn seed_product(
    api: &OrderFlowApi<SqliteDatabase, RecordingNotifier>,
    id: &str,
    name: &str,
    price: i64,
    stock: i64,
) -> Result<()> {
    api.db()
        .upsert_product(NewProduct {
            id: ProductId::from(id),
            name: name.into(),
            price: Cents::from(price),
            stock,
        })
        .await?;
    Ok(())
}

fn cart(items: Vec<(&str, i64)>) -> NewOrderRequest {
    NewOrderRequest {
        items: items
            .into_iter()
            .map(|(product_id, quantity)| CartItem { product_id: product_id.into(), quantity })
            .collect(),
        shipping_address: ShippingAddress {
            name: "A. Customer".into(),
            street: "Main St 1".into(),
            postal_code: "10115".into(),
            city: "Berlin".into(),
            country: "DE".into(),
            email: "customer@example.com".into(),
        },
        customer_email: "customer@example.com".into(),
    }
}

async fn order_count(api: &OrderFlowApi<SqliteDatabase, RecordingNotifier>) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(api.db().pool()).await?;
    Ok(count)
}

async fn stock_of(api: &OrderFlowApi<SqliteDatabase, RecordingNotifier>, id: &str) -> Result<i64> {
    let product = api.db().fetch_product(&ProductId::from(id)).await?.expect("product should exist");
    Ok(product.stock)
}

#[tokio::test]
async fn order_creation_computes_total_from_catalog() -> Result<()> {
    let (api, _) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;
    seed_product(&api, "p2", "Pine stool", 2550, 3).await?;

    let order = api.place_order(cart(vec![("p1", 2), ("p2", 1)])).await?;
    assert_eq!(order.total, Cents::from(4550));
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!order.stock_updated);
    assert_eq!(order.items.len(), 2);
    assert!(order.payment_intent_id.is_none());

    // Creation is a pure check against stock; nothing was reserved.
    assert_eq!(stock_of(&api, "p1").await?, 5);
    Ok(())
}

#[tokio::test]
async fn over_stock_cart_is_rejected_and_nothing_persists() -> Result<()> {
    let (api, _) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;

    let err = api.place_order(cart(vec![("p1", 6)])).await.unwrap_err();
    match err {
        OrderFlowError::Validation(OrderValidationError::InsufficientStock(name)) => {
            assert_eq!(name, "Oak shelf");
        },
        other => panic!("expected stock rejection, got {other:?}"),
    }
    assert_eq!(order_count(&api).await?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_product_is_rejected() -> Result<()> {
    let (api, _) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;

    let err = api.place_order(cart(vec![("p1", 1), ("ghost", 1)])).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Validation(OrderValidationError::UnknownProducts)));
    assert_eq!(order_count(&api).await?, 0);
    Ok(())
}

#[tokio::test]
async fn reconciliation_decrements_stock_and_completes_the_order() -> Result<()> {
    let (api, notifier) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;

    let order = api.place_order(cart(vec![("p1", 2)])).await?;
    assert_eq!(order.total, Cents::from(2000));
    api.attach_payment_intent(&order.id, "pi_test_1").await?;

    let status = api.confirm_payment("pi_test_1").await?;
    let completed = match status {
        ReconciliationStatus::Completed(order) => order,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(completed.status, OrderStatus::Completed);
    assert!(completed.stock_updated);
    assert_eq!(stock_of(&api, "p1").await?, 3);
    assert_eq!(notifier.customer.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.office.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn redelivered_confirmation_is_a_no_op() -> Result<()> {
    let (api, notifier) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;

    let order = api.place_order(cart(vec![("p1", 2)])).await?;
    api.attach_payment_intent(&order.id, "pi_test_1").await?;

    assert!(matches!(api.confirm_payment("pi_test_1").await?, ReconciliationStatus::Completed(_)));
    assert_eq!(stock_of(&api, "p1").await?, 3);

    // Same event again: no decrement, no second notification, still completed exactly once.
    assert!(matches!(api.confirm_payment("pi_test_1").await?, ReconciliationStatus::AlreadyProcessed));
    assert_eq!(stock_of(&api, "p1").await?, 3);
    assert_eq!(notifier.customer.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.office.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_payment_intent_is_acknowledged_without_mutation() -> Result<()> {
    let (api, notifier) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;
    let order = api.place_order(cart(vec![("p1", 2)])).await?;

    assert!(matches!(api.confirm_payment("pi_unmatched").await?, ReconciliationStatus::NoMatchingOrder));
    assert_eq!(stock_of(&api, "p1").await?, 5);
    let order = api.fetch_order(&order.id).await?;
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!order.stock_updated);
    assert_eq!(notifier.customer.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn deleted_product_is_skipped_but_the_order_still_completes() -> Result<()> {
    let (api, _) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;
    seed_product(&api, "p2", "Pine stool", 2550, 3).await?;

    let order = api.place_order(cart(vec![("p1", 1), ("p2", 1)])).await?;
    api.attach_payment_intent(&order.id, "pi_test_1").await?;
    assert!(api.db().delete_product(&ProductId::from("p2")).await?);

    let status = api.confirm_payment("pi_test_1").await?;
    let completed = match status {
        ReconciliationStatus::Completed(order) => order,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(completed.status, OrderStatus::Completed);
    assert!(completed.stock_updated);
    assert_eq!(stock_of(&api, "p1").await?, 4);
    Ok(())
}

#[tokio::test]
async fn short_stock_at_reconciliation_skips_the_decrement() -> Result<()> {
    let (api, _) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;

    let order = api.place_order(cart(vec![("p1", 4)])).await?;
    api.attach_payment_intent(&order.id, "pi_test_1").await?;
    // Stock drains before the confirmation lands.
    seed_product(&api, "p1", "Oak shelf", 1000, 1).await?;

    let status = api.confirm_payment("pi_test_1").await?;
    assert!(matches!(status, ReconciliationStatus::Completed(_)));
    // Decrement skipped, stock untouched, never negative.
    assert_eq!(stock_of(&api, "p1").await?, 1);
    let order = api.fetch_order(&order.id).await?;
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.stock_updated);
    Ok(())
}

#[tokio::test]
async fn patch_updates_status_and_payment_intent() -> Result<()> {
    let (api, _) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;
    let order = api.place_order(cart(vec![("p1", 1)])).await?;

    let update = ModifyOrderRequest::default().with_payment_intent_id("pi_patch");
    let order = api.update_order(&order.id, update).await?;
    assert_eq!(order.payment_intent_id.as_deref(), Some("pi_patch"));
    assert_eq!(order.status, OrderStatus::Pending);

    let update = ModifyOrderRequest::default().with_status(OrderStatus::Completed);
    let order = api.update_order(&order.id, update).await?;
    assert_eq!(order.status, OrderStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn patching_an_unknown_order_is_not_found() -> Result<()> {
    let (api, _) = new_api().await?;
    let missing = OrderId::from("ffffffffffffffffffffffff".to_string());
    let err = api
        .update_order(&missing, ModifyOrderRequest::default().with_payment_intent_id("pi_x"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderFlowError::Database(StorefrontError::OrderNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn attaching_a_second_intent_overwrites_the_first() -> Result<()> {
    let (api, _) = new_api().await?;
    seed_product(&api, "p1", "Oak shelf", 1000, 5).await?;
    let order = api.place_order(cart(vec![("p1", 1)])).await?;

    api.attach_payment_intent(&order.id, "pi_first").await?;
    let order = api.attach_payment_intent(&order.id, "pi_second").await?;
    assert_eq!(order.payment_intent_id.as_deref(), Some("pi_second"));

    // The stale reference no longer matches anything.
    assert!(matches!(api.confirm_payment("pi_first").await?, ReconciliationStatus::NoMatchingOrder));
    assert!(matches!(api.confirm_payment("pi_second").await?, ReconciliationStatus::Completed(_)));
    Ok(())
}
