use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product, ProductId},
    traits::StorefrontError,
};

/// Fetch all products whose id is in `ids`. Ids that match nothing are simply absent from the result.
pub async fn fetch_products_by_ids(
    ids: &[ProductId],
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM products WHERE id IN (");
    let mut in_clause = builder.separated(", ");
    for id in ids {
        in_clause.push_bind(id.as_str());
    }
    builder.push(")");
    trace!("📦️ Executing query: {}", builder.sql());
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

pub async fn fetch_product(id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await
}

/// Create the product, or refresh name, price and stock when it already exists.
pub async fn upsert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, StorefrontError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (id, name, price, stock) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                stock = excluded.stock,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *
        "#,
    )
    .bind(product.id.as_str())
    .bind(product.name.as_str())
    .bind(product.price)
    .bind(product.stock)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn delete_product(id: &ProductId, conn: &mut SqliteConnection) -> Result<bool, StorefrontError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id.as_str()).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

/// Conditional stock decrement: applies only when the product still has at least `quantity` units, so
/// concurrent orders draining the same product cannot push stock negative. Returns `false` (and writes
/// nothing) otherwise.
pub(crate) async fn decrement_stock(
    id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, StorefrontError> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND stock >= $1",
    )
    .bind(quantity)
    .bind(id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
