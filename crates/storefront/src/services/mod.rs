//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Username/password registration and login
//! - `avatars` - Avatar upload validation and storage
//! - `checkout` - Address selection and transactional order placement
//! - `email` - Order confirmation emails

pub mod auth;
pub mod avatars;
pub mod checkout;
pub mod email;

pub use auth::{AuthError, AuthService};
pub use avatars::{AvatarError, AvatarStore};
pub use checkout::{CheckoutService, NotifyError, PlaceOrderError, PlacedOrder};
pub use email::{EmailError, EmailService};
