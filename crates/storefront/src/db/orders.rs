//! Order repository.
//!
//! Orders are written only by checkout, inside the transaction that also
//! empties the cart. Afterwards the only mutation is a status change.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use selldesk_core::{Money, OrderDraft, OrderId, OrderStatus, ProductId, UserId};

use super::{RepositoryError, corrupt};
use crate::models::{Order, OrderLine};

const ORDER_COLUMNS: &str = "id, amount, paid, status, shipping_address, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    amount: Decimal,
    paid: bool,
    status: String,
    shipping_address: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: OrderId,
    product_id: ProductId,
    title: String,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            title: row.title,
            quantity: row.quantity,
            unit_price: Money::new(row.unit_price).map_err(corrupt("unit price"))?,
        })
    }
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: self.id,
            amount: Money::new(self.amount).map_err(corrupt("order amount"))?,
            paid: self.paid,
            status: self.status.parse().map_err(corrupt("order status"))?,
            shipping_address: self.shipping_address,
            created_at: self.created_at,
            lines,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's orders with their lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let headers = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = headers.iter().map(|h| h.id.as_i64()).collect();
        let mut lines = self.lines_for(&ids).await?;

        headers
            .into_iter()
            .map(|header| {
                let order_lines = lines.remove(&header.id).unwrap_or_default();
                header.into_order(order_lines)
            })
            .collect()
    }

    /// One order, only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let header = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders
             WHERE id = $1 AND user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let mut lines = self.lines_for(&[order_id.as_i64()]).await?;
        let order_lines = lines.remove(&order_id).unwrap_or_default();
        header.into_order(order_lines).map(Some)
    }

    /// Change the status of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE storefront.orders SET status = $2 WHERE id = $1")
            .bind(order_id)
            .bind(status)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn lines_for(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            "SELECT l.order_id, l.product_id, p.title, l.quantity, l.unit_price
             FROM storefront.order_line l
             JOIN storefront.product p ON p.id = l.product_id
             WHERE l.order_id = ANY($1)
             ORDER BY l.id",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped
                .entry(order_id)
                .or_default()
                .push(OrderLine::try_from(row)?);
        }
        Ok(grouped)
    }
}

/// Write an order header and its lines inside the checkout transaction.
pub(crate) async fn insert_draft(
    conn: &mut PgConnection,
    draft: &OrderDraft,
) -> Result<OrderId, RepositoryError> {
    let order_id = sqlx::query_scalar::<_, OrderId>(
        "INSERT INTO storefront.orders
             (user_id, profile_id, shipping_address, amount, paid, status)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(draft.account)
    .bind(draft.address_id)
    .bind(&draft.address_snapshot)
    .bind(draft.amount)
    .bind(draft.paid)
    .bind(draft.status)
    .fetch_one(&mut *conn)
    .await?;

    for line in &draft.lines {
        sqlx::query(
            "INSERT INTO storefront.order_line (order_id, product_id, quantity, unit_price)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;
    }

    Ok(order_id)
}
