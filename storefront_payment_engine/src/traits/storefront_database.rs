use thiserror::Error;

use crate::{
    api::order_objects::ModifyOrderRequest,
    db_types::{NewOrder, NewProduct, Order, OrderId, Product, ProductId},
    traits::data_objects::FulfilmentOutcome,
};

/// The contract a storage backend must satisfy to host the storefront payment engine.
///
/// Two stores live behind this trait: the order store (exclusive owner of order records, reachable by id and by
/// the `payment_intent_id` secondary key) and the inventory store (product stock counts). The mutation
/// discipline is narrow: order creation writes items/total/status, [`set_payment_intent`] writes only the
/// payment reference, and [`fulfil_order`] is the single place where stock is decremented and an order is moved
/// to `Completed`.
///
/// [`set_payment_intent`]: StorefrontDatabase::set_payment_intent
/// [`fulfil_order`]: StorefrontDatabase::fulfil_order
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Fetch every catalog product whose id appears in `ids`. Unknown ids are simply absent from the result;
    /// callers compare counts to detect them.
    async fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StorefrontError>;

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, StorefrontError>;

    /// Create or update a catalog product. Used by catalog sync and by tests to seed inventory.
    async fn upsert_product(&self, product: NewProduct) -> Result<Product, StorefrontError>;

    /// Remove a product from the catalog. Orders referencing it keep their line items; reconciliation skips the
    /// decrement for products that no longer exist.
    async fn delete_product(&self, id: &ProductId) -> Result<bool, StorefrontError>;

    /// Persist a validated new order together with its line items, atomically. The stored order starts out
    /// `Pending` with `stock_updated = false`.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorefrontError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError>;

    /// Secondary lookup used during reconciliation.
    async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, StorefrontError>;

    /// Apply a partial update to an order. Returns `None` when the order does not exist and
    /// [`StorefrontError::OrderModificationNoOp`] when the request carries no changes.
    async fn update_order(&self, id: &OrderId, update: ModifyOrderRequest) -> Result<Option<Order>, StorefrontError>;

    /// Record the external transaction reference on an order. Calling this again overwrites the previous
    /// reference; the engine deliberately does not guard against it (see DESIGN notes on intent idempotency).
    async fn set_payment_intent(&self, id: &OrderId, payment_intent_id: &str)
        -> Result<Option<Order>, StorefrontError>;

    /// The reconciliation core. In a single transaction: resolve the order by `payment_intent_id`, atomically
    /// claim it (`stock_updated 0 → 1`, `status → Completed`, conditional on the guard still being clear), then
    /// decrement stock per item with conditional updates, skipping items whose product is missing or short on
    /// stock. The claim and the decrements commit together or not at all.
    ///
    /// The outcome distinguishes the two benign races (no matching order, already processed) from an actual
    /// fulfilment so that callers can log and acknowledge without treating them as failures.
    async fn fulfil_order(&self, payment_intent_id: &str) -> Result<FulfilmentOutcome, StorefrontError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorefrontError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("The requested order change would result in a no-op")]
    OrderModificationNoOp,
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        StorefrontError::DatabaseError(e.to_string())
    }
}
