use std::fmt::Debug;

use log::*;

use crate::{
    api::{
        order_objects::{ModifyOrderRequest, NewOrderRequest},
        validation,
        OrderFlowError,
    },
    db_types::{NewOrder, Order, OrderId},
    traits::{
        FulfilmentOutcome,
        OrderConfirmation,
        OrderNotifier,
        StorefrontDatabase,
        StorefrontError,
    },
};

/// `OrderFlowApi` is the primary API for the order lifecycle: cart validation and order creation, partial
/// updates, payment-intent bookkeeping, and the reconciliation flow that runs when the processor confirms a
/// payment.
pub struct OrderFlowApi<B, N> {
    db: B,
    notifier: N,
}

impl<B, N> Debug for OrderFlowApi<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, N> OrderFlowApi<B, N> {
    pub fn new(db: B, notifier: N) -> Self {
        Self { db, notifier }
    }
}

/// What the reconciliation flow did for a confirmation event. All three variants are acknowledged upstream;
/// only `Completed` changed anything.
#[derive(Debug, Clone)]
pub enum ReconciliationStatus {
    NoMatchingOrder,
    AlreadyProcessed,
    Completed(Order),
}

impl<B, N> OrderFlowApi<B, N>
where
    B: StorefrontDatabase,
    N: OrderNotifier,
{
    /// Validate a cart submission and persist it as a `Pending` order.
    ///
    /// The checks run in a fixed order (shape, address, emails, existence, stock) and the first violation
    /// rejects the whole request; no order is persisted and no stock is reserved. The total is computed from
    /// catalog prices — anything the client claims about prices is ignored.
    pub async fn place_order(&self, req: NewOrderRequest) -> Result<Order, OrderFlowError> {
        validation::validate_cart(&req)?;
        let ids = validation::distinct_product_ids(&req);
        let products = self.db.fetch_products(&ids).await?;
        let (items, total) = validation::resolve_items(&req, &products)?;
        let order = NewOrder::new(items, total, req.shipping_address, req.customer_email);
        let order = self.db.insert_order(order).await?;
        info!("🛒️ Order {} created. {} item(s), total {}", order.id, order.items.len(), order.total);
        Ok(order)
    }

    pub async fn fetch_order(&self, id: &OrderId) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(id).await?.ok_or_else(|| StorefrontError::OrderNotFound(id.clone()))?;
        Ok(order)
    }

    /// Apply a partial update (status and/or payment intent reference) to an existing order.
    pub async fn update_order(&self, id: &OrderId, update: ModifyOrderRequest) -> Result<Order, OrderFlowError> {
        let order =
            self.db.update_order(id, update).await?.ok_or_else(|| StorefrontError::OrderNotFound(id.clone()))?;
        debug!("🛒️ Order {} updated", order.id);
        Ok(order)
    }

    /// Record the external transaction id on an order after a payment intent has been created for it.
    ///
    /// Deliberately not idempotent: a second call overwrites the stored reference, mirroring the fact that the
    /// processor was asked for a second transaction. See DESIGN.md.
    pub async fn attach_payment_intent(&self, id: &OrderId, payment_intent_id: &str) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .set_payment_intent(id, payment_intent_id)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(id.clone()))?;
        info!("💳️ Payment intent {payment_intent_id} recorded on order {}", order.id);
        Ok(order)
    }

    /// Reconcile a confirmed payment: idempotently decrement stock, move the order to `Completed`, and send the
    /// confirmation notifications.
    ///
    /// The store performs the claim-and-decrement atomically, so redelivered or concurrent duplicate events
    /// fall out as `AlreadyProcessed` here. Events whose transaction id matches no order are acknowledged as a
    /// benign race. Notification failures are logged and never undo the committed transition.
    pub async fn confirm_payment(&self, payment_intent_id: &str) -> Result<ReconciliationStatus, OrderFlowError> {
        match self.db.fulfil_order(payment_intent_id).await? {
            FulfilmentOutcome::NoMatchingOrder => {
                info!("💰️ No order found for payment intent {payment_intent_id}. Acknowledging without action.");
                Ok(ReconciliationStatus::NoMatchingOrder)
            },
            FulfilmentOutcome::AlreadyProcessed(order_id) => {
                info!("💰️ Stock already updated for order {order_id}. Duplicate event ignored.");
                Ok(ReconciliationStatus::AlreadyProcessed)
            },
            FulfilmentOutcome::Fulfilled(receipt) => {
                for skip in &receipt.skipped {
                    warn!(
                        "💰️ Skipped stock decrement for {} (x{}) on order {}: {}",
                        skip.product_id, skip.quantity, receipt.order.id, skip.reason
                    );
                }
                info!("💰️ Order {} completed for payment intent {payment_intent_id}", receipt.order.id);
                let confirmation = OrderConfirmation {
                    order: receipt.order.clone(),
                    lines: receipt.lines,
                    payment_intent_id: payment_intent_id.to_string(),
                };
                if let Err(e) = self.notifier.send_customer_confirmation(&confirmation).await {
                    error!("📧️ Could not send customer confirmation for order {}: {e}", confirmation.order.id);
                } else {
                    debug!("📧️ Customer confirmation sent to {}", confirmation.order.customer_email);
                }
                if let Err(e) = self.notifier.send_office_notification(&confirmation).await {
                    error!("📧️ Could not send office notification for order {}: {e}", confirmation.order.id);
                }
                Ok(ReconciliationStatus::Completed(receipt.order))
            },
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
