//! Database operations for the storefront `PostgreSQL` schema.
//!
//! ## Tables (schema `storefront`)
//!
//! - `users`, `user_password` - Accounts and argon2 password hashes
//! - `product` - Catalog, written by the CLI importer
//! - `profile` - Delivery address and avatar, one per user
//! - `cart_line` - Unique per (user, product), quantity >= 1
//! - `orders`, `order_line` - Placed orders with frozen prices
//! - `wishlist` - Unique per (user, product)
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p selldesk-cli -- migrate
//! ```

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod profiles;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart::CartRepository;
pub use catalog::ProductRepository;
pub use orders::OrderRepository;
pub use profiles::ProfileRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to domain errors.
    ///
    /// A foreign-key failure on insert means the referenced product or user
    /// does not exist, which callers treat as [`RepositoryError::NotFound`].
    pub(crate) fn from_write(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::NotFound;
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Error mapper for stored values that fail domain validation.
pub(crate) fn corrupt<E: std::fmt::Display>(
    what: &'static str,
) -> impl FnOnce(E) -> RepositoryError {
    move |e| RepositoryError::DataCorruption(format!("invalid {what} in database: {e}"))
}
