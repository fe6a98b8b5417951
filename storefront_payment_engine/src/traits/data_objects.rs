use std::fmt::Display;

use spg_common::Cents;

use crate::db_types::{Order, OrderId, ProductId};

/// Result of running the reconciliation transaction for an external transaction id.
#[derive(Debug, Clone)]
pub enum FulfilmentOutcome {
    /// No order carries this payment intent id. Benign: the event may have arrived before the order's
    /// reference was persisted, or the order was deleted.
    NoMatchingOrder,
    /// The order's idempotency guard was already set; nothing was changed.
    AlreadyProcessed(OrderId),
    /// The order was moved to `Completed` and stock was decremented (with possible per-item skips).
    Fulfilled(FulfilmentReceipt),
}

/// What actually happened during a successful fulfilment, for logging and notification rendering.
#[derive(Debug, Clone)]
pub struct FulfilmentReceipt {
    /// The order as persisted after the transition (`Completed`, `stock_updated = true`).
    pub order: Order,
    /// One entry per line item whose product still exists, whether or not its decrement was applied.
    pub lines: Vec<LineSummary>,
    /// Items whose stock decrement was skipped.
    pub skipped: Vec<SkippedItem>,
}

#[derive(Debug, Clone)]
pub struct LineSummary {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Cents,
    pub line_total: Cents,
}

#[derive(Debug, Clone)]
pub struct SkippedItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The product was removed from the catalog after the order was placed.
    ProductMissing,
    /// Fewer units in stock than the order requested.
    InsufficientStock { available: i64 },
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ProductMissing => write!(f, "product no longer exists"),
            SkipReason::InsufficientStock { available } => write!(f, "insufficient stock ({available} available)"),
        }
    }
}
