use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only event type that drives an order state transition. Everything else is acknowledged and ignored.
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// A payment intent as returned by `POST /v1/payment_intents`, trimmed to the fields the gateway uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Continuation token handed back to the storefront so it can complete the payment client-side.
    pub client_secret: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub payment_method_types: Vec<String>,
}

/// An asynchronous confirmation event as delivered to the webhook endpoint.
///
/// The shape of `data.object` varies with the event type, so it is kept as raw JSON and interrogated through
/// [`PaymentEvent::object_id`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}

impl PaymentEvent {
    pub fn is_payment_succeeded(&self) -> bool {
        self.event_type == PAYMENT_INTENT_SUCCEEDED
    }

    /// The id of the object the event is about. For `payment_intent.*` events this is the external transaction id
    /// that orders are keyed on during reconciliation.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(Value::as_str)
    }
}
