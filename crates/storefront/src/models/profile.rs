//! Shopper profile: delivery address and avatar.

use selldesk_core::{OwnedAddress, ProfileId, ShippingAddress, UserId};

/// Default avatar shown until the shopper uploads one.
pub const DEFAULT_AVATAR: &str = "/static/img/default-avatar.svg";

/// The single profile attached to a user.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub address: ShippingAddress,
    /// Avatar path relative to the media directory.
    pub avatar: Option<String>,
}

impl Profile {
    /// The profile address tagged with its owner, for checkout validation.
    #[must_use]
    pub fn owned_address(&self) -> OwnedAddress {
        OwnedAddress {
            id: self.id,
            owner: self.user_id,
            address: self.address.clone(),
        }
    }

    /// URL of the avatar image.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        self.avatar
            .as_ref()
            .map_or_else(|| DEFAULT_AVATAR.to_owned(), |path| format!("/media/{path}"))
    }
}
