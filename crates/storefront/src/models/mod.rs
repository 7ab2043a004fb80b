//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod flash;
pub mod order;
pub mod product;
pub mod profile;
pub mod session;
pub mod user;
pub mod wishlist;

pub use flash::{FlashLevel, FlashMessage};
pub use order::{Order, OrderLine};
pub use product::Product;
pub use profile::Profile;
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
pub use wishlist::WishlistItem;
