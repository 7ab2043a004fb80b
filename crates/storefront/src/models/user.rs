//! User domain types.

use chrono::{DateTime, Utc};

use selldesk_core::{Email, UserId};

/// A storefront account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Address order confirmations are sent to.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
