use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    api::order_objects::ModifyOrderRequest,
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatus},
    traits::StorefrontError,
};

/// Inserts a new order and its line items using the given connection. Not atomic on its own; embed the call in
/// a transaction and pass `&mut *tx` when atomicity is required.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StorefrontError> {
    sqlx::query(
        r#"
            INSERT INTO orders (
                id,
                total,
                status,
                ship_name,
                ship_street,
                ship_postal_code,
                ship_city,
                ship_country,
                ship_email,
                customer_email
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(order.id.as_str())
    .bind(order.total)
    .bind(OrderStatus::Pending.to_string())
    .bind(order.shipping_address.name.as_str())
    .bind(order.shipping_address.street.as_str())
    .bind(order.shipping_address.postal_code.as_str())
    .bind(order.shipping_address.city.as_str())
    .bind(order.shipping_address.country.as_str())
    .bind(order.shipping_address.email.as_str())
    .bind(order.customer_email.as_str())
    .execute(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query("INSERT INTO order_items (order_id, product_id, quantity) VALUES ($1, $2, $3)")
            .bind(order.id.as_str())
            .bind(item.product_id.as_str())
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?;
    }
    let id = order.id.clone();
    let order = fetch_order(&id, conn).await?.ok_or(StorefrontError::OrderNotFound(id))?;
    debug!("📝️ Order {} inserted", order.id);
    Ok(order)
}

/// Fetch an order by id, with its line items hydrated.
pub async fn fetch_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(&mut *conn).await?;
    hydrate_items(order, conn).await
}

/// Secondary lookup on the external transaction reference.
pub async fn fetch_order_by_payment_intent(
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE payment_intent_id = $1")
        .bind(payment_intent_id)
        .fetch_optional(&mut *conn)
        .await?;
    hydrate_items(order, conn).await
}

pub async fn fetch_order_items(id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT product_id, quantity FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(id.as_str())
        .fetch_all(&mut *conn)
        .await
}

async fn hydrate_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(mut order) => {
            order.items = fetch_order_items(&order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

pub(crate) async fn update_order(
    id: &OrderId,
    update: ModifyOrderRequest,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorefrontError> {
    if update.is_empty() {
        debug!("📝️ No fields to update for order {id}. Update request skipped.");
        return Err(StorefrontError::OrderModificationNoOp);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(status) = update.new_status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(payment_intent_id) = update.new_payment_intent_id {
        set_clause.push("payment_intent_id = ");
        set_clause.push_bind_unseparated(payment_intent_id);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.as_str());
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let order = builder.build().fetch_optional(&mut *conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    Ok(hydrate_items(order, conn).await?)
}

pub(crate) async fn set_payment_intent(
    id: &OrderId,
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorefrontError> {
    let order: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_intent_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(payment_intent_id)
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(hydrate_items(order, conn).await?)
}

/// The atomic half of the idempotency guard: move the order to `Completed` and set `stock_updated`, but only if
/// the guard is still clear. Returns `false` when another delivery of the same event got there first (or the
/// order was already reconciled), in which case nothing was written.
pub(crate) async fn claim_fulfilment(id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, StorefrontError> {
    let result = sqlx::query(
        "UPDATE orders SET stock_updated = 1, status = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $2 AND stock_updated = 0",
    )
    .bind(OrderStatus::Completed.to_string())
    .bind(id.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
