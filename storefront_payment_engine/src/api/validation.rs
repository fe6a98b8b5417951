//! Cart validation.
//!
//! Checks run in a fixed order and the first failure aborts the whole request; nothing is persisted and no
//! stock is reserved. Shape checks ([`validate_cart`]) need no catalog access; [`resolve_items`] then prices
//! the cart against the resolved products and enforces existence and stock limits.

use std::collections::BTreeSet;

use spg_common::Cents;
use thiserror::Error;

use crate::{
    api::order_objects::NewOrderRequest,
    db_types::{OrderItem, Product, ProductId},
    helpers::is_valid_email,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderValidationError {
    #[error("Order must contain at least one item")]
    EmptyCart,
    #[error("Invalid product id: {0}")]
    InvalidProductId(String),
    #[error("Each item must have a quantity of at least 1")]
    InvalidQuantity,
    #[error("All shipping address fields are required")]
    IncompleteAddress,
    #[error("Invalid shipping address email")]
    InvalidAddressEmail,
    #[error("A valid customer email is required")]
    InvalidCustomerEmail,
    #[error("One or more product ids are unknown")]
    UnknownProducts,
    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),
}

/// Shape checks 1–4: non-empty cart, well-formed ids and quantities, complete address, valid emails.
pub fn validate_cart(req: &NewOrderRequest) -> Result<(), OrderValidationError> {
    if req.items.is_empty() {
        return Err(OrderValidationError::EmptyCart);
    }
    for item in &req.items {
        if !ProductId::is_valid(&item.product_id) {
            return Err(OrderValidationError::InvalidProductId(item.product_id.clone()));
        }
        if item.quantity < 1 {
            return Err(OrderValidationError::InvalidQuantity);
        }
    }
    let a = &req.shipping_address;
    let address_fields = [&a.name, &a.street, &a.postal_code, &a.city, &a.country, &a.email];
    if address_fields.iter().any(|field| field.trim().is_empty()) {
        return Err(OrderValidationError::IncompleteAddress);
    }
    if !is_valid_email(&a.email) {
        return Err(OrderValidationError::InvalidAddressEmail);
    }
    if !is_valid_email(&req.customer_email) {
        return Err(OrderValidationError::InvalidCustomerEmail);
    }
    Ok(())
}

/// The distinct product ids referenced by the cart, in first-seen order.
pub fn distinct_product_ids(req: &NewOrderRequest) -> Vec<ProductId> {
    let mut seen = BTreeSet::new();
    req.items
        .iter()
        .filter(|item| seen.insert(item.product_id.as_str()))
        .map(|item| ProductId::from(item.product_id.clone()))
        .collect()
}

/// Checks 5–6 plus pricing: every distinct id must have resolved to a product, and every requested quantity
/// must fit the product's current stock. Returns the normalized items and the catalog-priced total.
pub fn resolve_items(
    req: &NewOrderRequest,
    products: &[Product],
) -> Result<(Vec<OrderItem>, Cents), OrderValidationError> {
    let distinct = distinct_product_ids(req);
    if products.len() != distinct.len() {
        return Err(OrderValidationError::UnknownProducts);
    }
    let mut total = Cents::default();
    let mut items = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let product = products
            .iter()
            .find(|p| p.id.as_str() == item.product_id)
            .ok_or(OrderValidationError::UnknownProducts)?;
        if item.quantity > product.stock {
            return Err(OrderValidationError::InsufficientStock(product.name.clone()));
        }
        total += product.price * item.quantity;
        items.push(OrderItem { product_id: product.id.clone(), quantity: item.quantity });
    }
    Ok((items, total))
}
