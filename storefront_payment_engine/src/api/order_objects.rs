use serde::{Deserialize, Serialize};

use crate::db_types::{OrderStatus, ShippingAddress};

/// One line of a submitted cart, exactly as the storefront sends it. Quantities default to zero (and thus fail
/// validation) rather than failing deserialization, so the caller gets a specific rejection message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i64,
}

/// A cart submission: items, destination address, and the email the confirmation goes to.
///
/// Note that the client never supplies prices. Totals are computed from the catalog during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewOrderRequest {
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub customer_email: String,
}

/// Partial order update, as accepted by `PATCH /orders/{id}`.
#[derive(Debug, Clone, Default)]
pub struct ModifyOrderRequest {
    pub new_status: Option<OrderStatus>,
    pub new_payment_intent_id: Option<String>,
}

impl ModifyOrderRequest {
    pub fn is_empty(&self) -> bool {
        self.new_status.is_none() && self.new_payment_intent_id.is_none()
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.new_status = Some(status);
        self
    }

    pub fn with_payment_intent_id<S: Into<String>>(mut self, id: S) -> Self {
        self.new_payment_intent_id = Some(id.into());
        self
    }
}
