use thiserror::Error;

use crate::{db_types::Order, traits::data_objects::LineSummary};

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Could not render notification: {0}")]
    RenderError(String),
    #[error("Could not send notification: {0}")]
    SendFailure(String),
}

/// Everything a notification needs to render an order summary: the completed order, the line items as priced at
/// fulfilment time, and the external transaction reference.
#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub order: Order,
    pub lines: Vec<LineSummary>,
    pub payment_intent_id: String,
}

impl OrderConfirmation {
    /// One line per item: `Oak shelf (x2): 20.00 €`.
    pub fn order_details(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{} (x{}): {}", line.name, line.quantity, line.line_total))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Postal address block in delivery-note layout.
    pub fn address_block(&self) -> String {
        let a = &self.order.shipping_address;
        format!("{}\n{}\n{} {}\n{}", a.name, a.street, a.postal_code, a.city, a.country)
    }
}

/// Outbound notification seam for completed orders.
///
/// Implementations must tolerate being called after the order state has already committed: a send failure is
/// logged by the caller and never rolls the order back, so implementations should return errors rather than
/// panic, and must not retry forever.
#[allow(async_fn_in_trait)]
pub trait OrderNotifier: Clone + Send + Sync + 'static {
    /// Confirmation mail to the customer who placed the order.
    async fn send_customer_confirmation(&self, confirmation: &OrderConfirmation) -> Result<(), NotifyError>;

    /// Copy to the back office so fulfilment can start.
    async fn send_office_notification(&self, confirmation: &OrderConfirmation) -> Result<(), NotifyError>;
}

/// A notifier that drops everything. Used in tests and as a stand-in while mail is unconfigured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl OrderNotifier for NullNotifier {
    async fn send_customer_confirmation(&self, _confirmation: &OrderConfirmation) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn send_office_notification(&self, _confirmation: &OrderConfirmation) -> Result<(), NotifyError> {
        Ok(())
    }
}
