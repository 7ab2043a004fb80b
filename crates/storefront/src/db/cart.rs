//! Cart repository.
//!
//! Every mutation is a single statement so concurrent requests from the same
//! shopper cannot lose updates.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use selldesk_core::{CartLine, LineAdjustment, MIN_QUANTITY, Money, ProductId, QuantityPolicy, UserId};

use super::{RepositoryError, corrupt};

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: ProductId,
    title: String,
    image: String,
    discounted_price: Decimal,
    quantity: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            title: row.title,
            image: row.image,
            unit_price: Money::new(row.discounted_price).map_err(corrupt("discounted price"))?,
            quantity: row.quantity,
        })
    }
}

const LINES_QUERY: &str = "SELECT c.product_id, p.title, p.image, p.discounted_price, c.quantity
                           FROM storefront.cart_line c
                           JOIN storefront.product p ON p.id = c.product_id
                           WHERE c.user_id = $1";

// `$3` is always bound to `MIN_QUANTITY`.
fn upsert_sql(policy: QuantityPolicy) -> &'static str {
    match policy {
        QuantityPolicy::Increment => {
            "INSERT INTO storefront.cart_line AS c (user_id, product_id, quantity)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, product_id)
             DO UPDATE SET quantity = c.quantity + 1
             RETURNING quantity"
        }
        QuantityPolicy::ResetToOne => {
            "INSERT INTO storefront.cart_line AS c (user_id, product_id, quantity)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, product_id)
             DO UPDATE SET quantity = $3
             RETURNING quantity"
        }
    }
}

fn adjust_sql(adjustment: LineAdjustment) -> &'static str {
    match adjustment {
        LineAdjustment::Increment => {
            "UPDATE storefront.cart_line
             SET quantity = quantity + 1
             WHERE user_id = $1 AND product_id = $2
             RETURNING quantity"
        }
        LineAdjustment::Decrement => {
            "UPDATE storefront.cart_line
             SET quantity = GREATEST(quantity - 1, $3)
             WHERE user_id = $1 AND product_id = $2
             RETURNING quantity"
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add one unit of a product, creating the line if needed.
    ///
    /// Returns the resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn add_or_increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<i32, RepositoryError> {
        self.upsert(user_id, product_id, QuantityPolicy::Increment)
            .await
    }

    /// Put exactly one unit of a product in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_quantity_for_buy_now(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<i32, RepositoryError> {
        self.upsert(user_id, product_id, QuantityPolicy::ResetToOne)
            .await
    }

    async fn upsert(
        &self,
        user_id: UserId,
        product_id: ProductId,
        policy: QuantityPolicy,
    ) -> Result<i32, RepositoryError> {
        let quantity = sqlx::query_scalar::<_, i32>(upsert_sql(policy))
            .bind(user_id)
            .bind(product_id)
            .bind(MIN_QUANTITY)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "cart line already exists"))?;

        tracing::debug!(%user_id, %product_id, ?policy, quantity, "Cart line upserted");
        Ok(quantity)
    }

    /// Adjust an existing line by one unit. Quantity never drops below one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    pub async fn adjust(
        &self,
        user_id: UserId,
        product_id: ProductId,
        adjustment: LineAdjustment,
    ) -> Result<i32, RepositoryError> {
        sqlx::query_scalar::<_, i32>(adjust_sql(adjustment))
            .bind(user_id)
            .bind(product_id)
            .bind(MIN_QUANTITY)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Remove a line. Removing a missing line is not an error.
    ///
    /// Returns whether a line was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.cart_line WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All lines in the user's cart, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(&format!("{LINES_QUERY} ORDER BY c.id"))
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }
}

/// Lock and read the user's cart lines inside a transaction.
///
/// Concurrent order placements serialize on these row locks; the loser sees
/// an empty cart once the winner commits.
pub(crate) async fn lock_lines(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartLineRow>(&format!(
        "{LINES_QUERY} ORDER BY c.id FOR UPDATE OF c"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(CartLine::try_from).collect()
}

/// Delete the ordered lines inside the placement transaction.
///
/// Only `products` are removed, so a line added after [`lock_lines`] ran
/// stays in the cart for the next order.
pub(crate) async fn remove_ordered(
    conn: &mut PgConnection,
    user_id: UserId,
    products: &[ProductId],
) -> Result<u64, RepositoryError> {
    let ids: Vec<i64> = products.iter().map(ProductId::as_i64).collect();
    let result = sqlx::query(
        "DELETE FROM storefront.cart_line WHERE user_id = $1 AND product_id = ANY($2)",
    )
    .bind(user_id)
    .bind(ids)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
