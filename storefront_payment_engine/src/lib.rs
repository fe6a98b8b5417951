//! Storefront Payment Engine
//!
//! The engine holds the core logic of the order and payment backend: cart validation, order persistence,
//! inventory bookkeeping, and the payment reconciliation state machine that moves an order from `Pending` to
//! `Completed` exactly once, however many times the processor redelivers a confirmation event.
//!
//! The crate is split the same way as the database-agnostic engines it grew out of:
//! 1. Database access lives behind the [`traits::StorefrontDatabase`] trait. A SQLite implementation backed by
//!    sqlx is provided; the low-level queries are plain functions over `&mut SqliteConnection` so they compose
//!    into transactions.
//! 2. The public API is [`OrderFlowApi`], which orchestrates validation, store mutations and notification
//!    dispatch. Notification delivery is injected through [`traits::OrderNotifier`] so that servers can plug in
//!    a real mail transport and tests can record calls.

mod api;
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod helpers;
pub mod traits;

pub use api::{
    order_flow_api::{OrderFlowApi, ReconciliationStatus},
    order_objects::{CartItem, ModifyOrderRequest, NewOrderRequest},
    validation::OrderValidationError,
    OrderFlowError,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
