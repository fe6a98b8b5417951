//! `SqliteDatabase` is the concrete SQLite implementation of [`StorefrontDatabase`].
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{new_pool, orders, products};
use crate::{
    api::order_objects::ModifyOrderRequest,
    db_types::{NewOrder, NewProduct, Order, OrderId, Product, ProductId},
    traits::{
        FulfilmentOutcome,
        FulfilmentReceipt,
        LineSummary,
        SkipReason,
        SkippedItem,
        StorefrontDatabase,
        StorefrontError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StorefrontError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StorefrontError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorefrontError::DatabaseError(e.to_string()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_products_by_ids(ids, &mut conn).await?;
        Ok(products)
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::upsert_product(product, &mut conn).await?;
        debug!("🗃️ Product {} upserted ({} in stock)", product.id, product.stock);
        Ok(product)
    }

    async fn delete_product(&self, id: &ProductId) -> Result<bool, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = products::delete_product(id, &mut conn).await?;
        if deleted {
            debug!("🗃️ Product {id} deleted");
        }
        Ok(deleted)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved with {} line item(s)", order.id, order.items.len());
        Ok(order)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_payment_intent(payment_intent_id, &mut conn).await?;
        Ok(order)
    }

    async fn update_order(&self, id: &OrderId, update: ModifyOrderRequest) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order(id, update, &mut conn).await
    }

    async fn set_payment_intent(
        &self,
        id: &OrderId,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_payment_intent(id, payment_intent_id, &mut conn).await
    }

    /// The reconciliation transaction. The conditional claim and the per-item decrements all run on one
    /// connection inside a single transaction: either the guard flips together with every applied decrement,
    /// or nothing is written. SQLite serializes writers, so two deliveries of the same event cannot both see
    /// `stock_updated = 0`.
    async fn fulfil_order(&self, payment_intent_id: &str) -> Result<FulfilmentOutcome, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::fetch_order_by_payment_intent(payment_intent_id, &mut tx).await? else {
            return Ok(FulfilmentOutcome::NoMatchingOrder);
        };
        if !orders::claim_fulfilment(&order.id, &mut tx).await? {
            return Ok(FulfilmentOutcome::AlreadyProcessed(order.id));
        }
        let mut lines = Vec::with_capacity(order.items.len());
        let mut skipped = Vec::new();
        for item in &order.items {
            let Some(product) = products::fetch_product(&item.product_id, &mut tx).await? else {
                warn!("🗃️ Product not found: {}", item.product_id);
                skipped.push(SkippedItem {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                    reason: SkipReason::ProductMissing,
                });
                continue;
            };
            if products::decrement_stock(&product.id, item.quantity, &mut tx).await? {
                debug!(
                    "🗃️ Reduced stock for {}: {} -> {}",
                    product.name,
                    product.stock,
                    product.stock - item.quantity
                );
            } else {
                warn!(
                    "🗃️ Insufficient stock for {}: {} available, {} requested",
                    product.name, product.stock, item.quantity
                );
                skipped.push(SkippedItem {
                    product_id: product.id.clone(),
                    quantity: item.quantity,
                    reason: SkipReason::InsufficientStock { available: product.stock },
                });
            }
            lines.push(LineSummary {
                product_id: product.id.clone(),
                name: product.name.clone(),
                quantity: item.quantity,
                unit_price: product.price,
                line_total: product.price * item.quantity,
            });
        }
        let order = orders::fetch_order(&order.id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order.id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order {} marked completed; stock updated", order.id);
        Ok(FulfilmentOutcome::Fulfilled(FulfilmentReceipt { order, lines, skipped }))
    }
}
