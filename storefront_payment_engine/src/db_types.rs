use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use spg_common::Cents;
use sqlx::{FromRow, Type};
#[cfg(feature = "sqlite")]
use sqlx::{sqlite::SqliteRow, Row};
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
/// Opaque order identifier, assigned by the store when the order is created.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generate a fresh identifier: 24 lowercase hex characters.
    pub fn random() -> Self {
        let bytes: [u8; 12] = rand::thread_rng().gen();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------       ProductId       -------------------------------------------------------
/// Identifier of a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Syntactic validity only; existence is checked against the catalog separately.
    pub fn is_valid(s: &str) -> bool {
        !s.is_empty() && s.len() <= 64 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl<S: Into<String>> From<S> for ProductId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------      OrderStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order has been created; payment has not been confirmed.
    Pending,
    /// Payment was confirmed and the order's side effects have been applied. Terminal.
    Completed,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct OrderStatusConversionError(String);

impl FromStr for OrderStatus {
    type Err = OrderStatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" | "pending" => Ok(Self::Pending),
            "Completed" | "completed" => Ok(Self::Completed),
            s => Err(OrderStatusConversionError(s.to_string())),
        }
    }
}

//--------------------------------------    ShippingAddress    -------------------------------------------------------
/// Destination address for an order. Every field is mandatory; the validator rejects carts where any is empty.
///
/// Deserialization defaults missing fields to empty strings so that incomplete submissions reach the validator
/// (and its specific error message) instead of dying in the JSON extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub name: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub email: String,
}

//--------------------------------------       OrderItem       -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

//--------------------------------------         Order         -------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub total: Cents,
    pub status: OrderStatus,
    /// Idempotency guard: set together with `status = Completed`, exactly once, in the same transaction as the
    /// inventory decrements. Checked, not `status`, when deciding whether a confirmation event is a duplicate.
    pub stock_updated: bool,
    pub shipping_address: ShippingAddress,
    pub customer_email: String,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// The address is stored in flattened `ship_*` columns, and items live in their own table, so the row mapping is
// spelled out rather than derived. `items` is hydrated by the order queries after the row is read.
#[cfg(feature = "sqlite")]
impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            items: Vec::new(),
            total: row.try_get("total")?,
            status: row.try_get("status")?,
            stock_updated: row.try_get("stock_updated")?,
            shipping_address: ShippingAddress {
                name: row.try_get("ship_name")?,
                street: row.try_get("ship_street")?,
                postal_code: row.try_get("ship_postal_code")?,
                city: row.try_get("ship_city")?,
                country: row.try_get("ship_country")?,
                email: row.try_get("ship_email")?,
            },
            customer_email: row.try_get("customer_email")?,
            payment_intent_id: row.try_get("payment_intent_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

//--------------------------------------        NewOrder       -------------------------------------------------------
/// A validated order-creation request, ready to persist. Only the validator produces these, so the items are
/// normalized and the total already comes from catalog prices.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub total: Cents,
    pub shipping_address: ShippingAddress,
    pub customer_email: String,
}

impl NewOrder {
    pub fn new(items: Vec<OrderItem>, total: Cents, shipping_address: ShippingAddress, customer_email: String) -> Self {
        Self { id: OrderId::random(), items, total, shipping_address, customer_email }
    }
}

//--------------------------------------        Product        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in euro cents.
    pub price: Cents,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Cents,
    pub stock: i64,
}
