//! Wishlist repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use selldesk_core::{Money, ProductId, UserId};

use super::{RepositoryError, corrupt};
use crate::models::WishlistItem;

#[derive(sqlx::FromRow)]
struct WishlistRow {
    product_id: ProductId,
    title: String,
    image: String,
    discounted_price: Decimal,
    added_at: DateTime<Utc>,
}

impl TryFrom<WishlistRow> for WishlistItem {
    type Error = RepositoryError;

    fn try_from(row: WishlistRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            title: row.title,
            image: row.image,
            discounted_price: Money::new(row.discounted_price)
                .map_err(corrupt("discounted price"))?,
            added_at: row.added_at,
        })
    }
}

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a product to the wishlist. Adding it twice is a no-op.
    ///
    /// Returns whether a new entry was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO storefront.wishlist (user_id, product_id)
             VALUES ($1, $2)
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "already wishlisted"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a product from the wishlist. Removing a missing entry is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM storefront.wishlist WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Wishlisted products, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            "SELECT w.product_id, p.title, p.image, p.discounted_price, w.added_at
             FROM storefront.wishlist w
             JOIN storefront.product p ON p.id = w.product_id
             WHERE w.user_id = $1
             ORDER BY w.added_at DESC, w.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(WishlistItem::try_from).collect()
    }

    /// Whether the product is on the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn contains(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                 SELECT 1 FROM storefront.wishlist WHERE user_id = $1 AND product_id = $2
             )",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}
