//! SMTP implementation of the engine's [`OrderNotifier`] seam, using lettre.
//!
//! The notifier is deliberately forgiving: when email is unconfigured it logs and drops sends instead of
//! failing, because by the time a notification fires the order transition has already committed.

use std::time::Duration;

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
};
use log::*;
use storefront_payment_engine::traits::{NotifyError, OrderConfirmation, OrderNotifier};

use crate::config::EmailConfig;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct SmtpNotifier {
    inner: Option<Inner>,
}

#[derive(Clone)]
struct Inner {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    office: String,
}

impl SmtpNotifier {
    pub fn from_config(config: Option<&EmailConfig>) -> Self {
        let Some(config) = config else {
            info!("📧️ Email is not configured. Order notifications will be logged and dropped.");
            return Self { inner: None };
        };
        match Self::build(config) {
            Ok(inner) => Self { inner: Some(inner) },
            Err(e) => {
                error!("📧️ Could not initialize the mail transport: {e}. Order notifications are disabled.");
                Self { inner: None }
            },
        }
    }

    fn build(config: &EmailConfig) -> Result<Inner, lettre::transport::smtp::Error> {
        let credentials = Credentials::new(config.username.clone(), config.password.reveal().clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(Inner { transport, from: config.username.clone(), office: config.office_address.clone() })
    }

    async fn send(&self, to: &str, subject: String, body: String) -> Result<(), NotifyError> {
        let Some(inner) = &self.inner else {
            warn!("📧️ Email not configured; dropping notification to {to}");
            return Ok(());
        };
        let from: Mailbox =
            inner.from.parse().map_err(|e| NotifyError::RenderError(format!("bad sender address: {e}")))?;
        let to: Mailbox = to.parse().map_err(|e| NotifyError::RenderError(format!("bad recipient address: {e}")))?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| NotifyError::RenderError(e.to_string()))?;
        inner.transport.send(message).await.map_err(|e| NotifyError::SendFailure(e.to_string()))?;
        Ok(())
    }
}

impl OrderNotifier for SmtpNotifier {
    async fn send_customer_confirmation(&self, confirmation: &OrderConfirmation) -> Result<(), NotifyError> {
        let subject = format!("Order confirmation {}", confirmation.order.id);
        let body = customer_body(confirmation);
        self.send(&confirmation.order.customer_email, subject, body).await
    }

    async fn send_office_notification(&self, confirmation: &OrderConfirmation) -> Result<(), NotifyError> {
        let Some(office) = self.inner.as_ref().map(|inner| inner.office.clone()) else {
            return Ok(());
        };
        let subject = format!("New order {}", confirmation.order.id);
        let body = office_body(confirmation);
        self.send(&office, subject, body).await
    }
}

fn customer_body(confirmation: &OrderConfirmation) -> String {
    format!(
        "<h2>Thank you for your order!</h2>\
         <p>Your order <strong>{id}</strong> has been placed successfully.</p>\
         <h3>Order summary</h3>\
         <pre>{details}</pre>\
         <p><strong>Total: {total}</strong></p>\
         <h3>Shipping address</h3>\
         <pre>{address}</pre>\
         <p>Payment status: Paid (transaction {txid})</p>\
         <p>We will let you know as soon as your order ships.</p>",
        id = confirmation.order.id,
        details = confirmation.order_details(),
        total = confirmation.order.total,
        address = confirmation.address_block(),
        txid = confirmation.payment_intent_id,
    )
}

fn office_body(confirmation: &OrderConfirmation) -> String {
    format!(
        "<h2>New order received</h2>\
         <p>Order number: <strong>{id}</strong></p>\
         <p>Customer: {name} ({email})</p>\
         <h3>Order summary</h3>\
         <pre>{details}</pre>\
         <p><strong>Total: {total}</strong></p>\
         <h3>Shipping address</h3>\
         <pre>{address}</pre>\
         <p>Payment status: Paid (transaction {txid})</p>",
        id = confirmation.order.id,
        name = confirmation.order.shipping_address.name,
        email = confirmation.order.customer_email,
        details = confirmation.order_details(),
        total = confirmation.order.total,
        address = confirmation.address_block(),
        txid = confirmation.payment_intent_id,
    )
}
