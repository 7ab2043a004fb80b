//! Wishlist entries.

use chrono::{DateTime, Utc};

use selldesk_core::{Money, ProductId};

/// A wishlisted product, joined with the fields the profile page shows.
#[derive(Debug, Clone)]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub title: String,
    pub image: String,
    pub discounted_price: Money,
    pub added_at: DateTime<Utc>,
}
