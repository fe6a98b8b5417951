use std::str::FromStr;

use serde::{Deserialize, Serialize};
use storefront_payment_engine::{db_types::OrderStatus, ModifyOrderRequest};

use crate::errors::ServerError;

/// Body of `PATCH /orders/{id}`. Both fields optional; an empty patch is rejected downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderUpdateParams {
    pub status: Option<String>,
    pub payment_intent_id: Option<String>,
}

impl TryFrom<OrderUpdateParams> for ModifyOrderRequest {
    type Error = ServerError;

    fn try_from(params: OrderUpdateParams) -> Result<Self, Self::Error> {
        let new_status = params
            .status
            .map(|s| OrderStatus::from_str(&s).map_err(|e| ServerError::OrderValidationError(e.to_string())))
            .transpose()?;
        Ok(ModifyOrderRequest { new_status, new_payment_intent_id: params.payment_intent_id })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentParams {
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecretResponse {
    pub client_secret: String,
}

/// Webhook acknowledgment. Always `{"received": true}` once the event has been processed, skips included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { received: true }
    }
}
