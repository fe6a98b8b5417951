//! Behaviour contracts for the engine's collaborators.
//!
//! [`StorefrontDatabase`] is the contract a storage backend must satisfy; [`OrderNotifier`] is the outbound
//! notification seam. Both are injected into [`crate::OrderFlowApi`], which keeps the orchestration layer free
//! of global state and lets tests substitute doubles.

mod data_objects;
mod notifier;
mod storefront_database;

pub use data_objects::{FulfilmentOutcome, FulfilmentReceipt, LineSummary, SkipReason, SkippedItem};
pub use notifier::{NotifyError, NullNotifier, OrderConfirmation, OrderNotifier};
pub use storefront_database::{StorefrontDatabase, StorefrontError};
