//! User repository for database operations.
//!
//! Accounts and their argon2 password hashes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use selldesk_core::{Email, UserId};

use super::{RepositoryError, corrupt};
use crate::models::User;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            username: row.username,
            email: Email::parse(&row.email).map_err(corrupt("email"))?,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Fields editable from the profile page.
#[derive(Debug, Clone)]
pub struct UserUpdate<'a> {
    pub username: &'a str,
    pub email: &'a Email,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a new user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        username: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO storefront.users (username, email)
             VALUES ($1, $2)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "username already exists"))?;

        sqlx::query(
            "INSERT INTO storefront.user_password (user_id, password_hash)
             VALUES ($1, $2)",
        )
        .bind(row.id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        User::try_from(row)
    }

    /// Get a user and their password hash by username.
    ///
    /// Returns `None` if the user doesn't exist or has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT u.id, u.username, u.email, u.first_name, u.last_name,
                    u.created_at, u.updated_at, p.password_hash
             FROM storefront.users u
             JOIN storefront.user_password p ON u.id = p.user_id
             WHERE u.username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some((User::try_from(row.user)?, row.password_hash)))
    }

    /// Update the profile fields of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new username is taken.
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &UserUpdate<'_>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE storefront.users
             SET username = $2, email = $3, first_name = $4, last_name = $5,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.username)
        .bind(update.email.as_str())
        .bind(update.first_name)
        .bind(update.last_name)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "username already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }
}
