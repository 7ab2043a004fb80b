//! Profile repository: delivery address and avatar, one row per user.

use sqlx::{PgConnection, PgPool};

use selldesk_core::{ProfileId, ShippingAddress, UserId};

use super::RepositoryError;
use crate::models::Profile;

const PROFILE_COLUMNS: &str = "id, user_id, name, locality, city, state, zipcode, avatar";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: ProfileId,
    user_id: UserId,
    name: String,
    locality: String,
    city: String,
    state: String,
    zipcode: Option<i32>,
    avatar: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            address: ShippingAddress {
                name: row.name,
                locality: row.locality,
                city: row.city,
                state: row.state,
                zipcode: row.zipcode,
            },
            avatar: row.avatar,
        }
    }
}

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's profile, creating an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Profile, RepositoryError> {
        sqlx::query(
            "INSERT INTO storefront.profile (user_id)
             VALUES ($1)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "profile already exists"))?;

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM storefront.profile WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get a profile by ID, regardless of owner.
    ///
    /// Ownership is checked by the caller so that a foreign address can be
    /// told apart from a missing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM storefront.profile WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    /// Saved addresses of a user (at most one).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM storefront.profile
             WHERE user_id = $1
             ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Profile::from).collect())
    }

    /// Replace the address fields of the user's profile, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_address(
        &self,
        user_id: UserId,
        address: &ShippingAddress,
    ) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO storefront.profile (user_id, name, locality, city, state, zipcode)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id) DO UPDATE
             SET name = EXCLUDED.name,
                 locality = EXCLUDED.locality,
                 city = EXCLUDED.city,
                 state = EXCLUDED.state,
                 zipcode = EXCLUDED.zipcode,
                 updated_at = NOW()
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&address.name)
        .bind(&address.locality)
        .bind(&address.city)
        .bind(&address.state)
        .bind(address.zipcode)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "profile already exists"))?;

        Ok(row.into())
    }

    /// Point the user's profile at a new avatar file.
    ///
    /// Returns the previous avatar path so the caller can delete the file.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_avatar(
        &self,
        user_id: UserId,
        path: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, Option<String>>(
            "SELECT avatar FROM storefront.profile WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .flatten();

        sqlx::query(
            "INSERT INTO storefront.profile (user_id, avatar)
             VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE
             SET avatar = EXCLUDED.avatar, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(path)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "profile already exists"))?;

        tx.commit().await?;

        Ok(previous)
    }
}

/// Read a profile inside a transaction, holding a share lock until commit.
pub(crate) async fn lock_by_id(
    conn: &mut PgConnection,
    id: ProfileId,
) -> Result<Option<Profile>, RepositoryError> {
    let row = sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM storefront.profile WHERE id = $1 FOR SHARE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Profile::from))
}
