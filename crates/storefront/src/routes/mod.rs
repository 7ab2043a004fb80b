//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (rate limited)
//! GET  /login, /register       - Login and registration pages
//! POST /login, /register       - Login and registration actions
//! POST /logout                 - Logout action
//!
//! # Pages (requires auth, as does everything below)
//! GET  /, /home, /about, /contact
//!
//! # Catalog
//! GET  /category/{code}                - Products in a category
//! GET  /category/{code}/{subcategory}  - Products in a subcategory
//! GET  /category-title/{title}         - Titles in a product's category
//! GET  /product/{id}                   - Product detail
//! GET  /search?q=                      - Search
//!
//! # Cart (GET or POST, product in ?prod_id=)
//! GET  /cart                   - Cart page
//! *    /add-to-cart            - Add or increment, redirect to cart
//! *    /buy-now                - Force quantity 1, redirect to checkout
//! *    /plus-cart, /minus-cart - Adjust quantity (JSON)
//! *    /remove-cart-item       - Remove line, redirect to checkout
//!
//! # Checkout
//! GET  /checkout               - Summary
//! GET  /confirm-address        - Address list
//! POST /confirm-address        - Select address
//! GET  /payment                - Payment page
//! POST /place-order            - Place order
//! GET  /order-success          - Confirmation
//!
//! # Wishlist (GET or POST, product in ?prod_id=)
//! *    /add-to-wishlist, /remove-from-wishlist
//!
//! # Account
//! GET  /profile                - Profile page
//! POST /profile                - Profile or address update
//! POST /profile/avatar         - Avatar upload (multipart)
//! GET  /address                - Address page
//! POST /address                - Address update
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod pages;
pub mod wishlist;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde::Deserialize;

use selldesk_core::{CategoryCode, ProductId};

use crate::error::AppError;
use crate::middleware::Flashes;
use crate::models::{CurrentUser, FlashMessage};
use crate::state::AppState;

/// Create the login and registration router.
///
/// Kept apart so the rate limiter wraps only these routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
}

/// Create the storefront routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(auth::logout))
        // Pages
        .route("/", get(pages::home))
        .route("/home", get(pages::home))
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact))
        // Catalog
        .route("/category/{code}", get(catalog::category))
        .route(
            "/category/{code}/{subcategory}",
            get(catalog::category_subcategory),
        )
        .route("/category-title/{title}", get(catalog::category_title))
        .route("/product/{id}", get(catalog::product_detail))
        .route("/search", get(catalog::search))
        // Cart
        .route("/cart", get(cart::show))
        .route("/add-to-cart", get(cart::add).post(cart::add))
        .route("/buy-now", get(cart::buy_now).post(cart::buy_now))
        .route("/plus-cart", get(cart::plus).post(cart::plus))
        .route("/minus-cart", get(cart::minus).post(cart::minus))
        .route("/remove-cart-item", get(cart::remove).post(cart::remove))
        // Checkout
        .route("/checkout", get(checkout::show))
        .route(
            "/confirm-address",
            get(checkout::confirm_address_page).post(checkout::confirm_address),
        )
        .route("/payment", get(checkout::payment))
        .route(
            "/place-order",
            get(checkout::place_order_redirect).post(checkout::place_order),
        )
        .route("/order-success", get(checkout::order_success))
        // Wishlist
        .route("/add-to-wishlist", get(wishlist::add).post(wishlist::add))
        .route(
            "/remove-from-wishlist",
            get(wishlist::remove).post(wishlist::remove),
        )
        // Account
        .route("/profile", get(account::profile).post(account::update_profile))
        .route(
            "/profile/avatar",
            post(account::upload_avatar).layer(DefaultBodyLimit::max(account::AVATAR_BODY_LIMIT)),
        )
        .route("/address", get(account::address_page).post(account::update_address))
}

// =============================================================================
// Shared view data
// =============================================================================

/// Data every page layout needs: the navigation bar and pending flashes.
pub struct Layout {
    pub username: Option<String>,
    pub flashes: Vec<FlashMessage>,
    pub categories: Vec<CategoryCode>,
}

impl Layout {
    /// Layout for a logged-in shopper.
    #[must_use]
    pub fn new(user: &CurrentUser, Flashes(flashes): Flashes) -> Self {
        Self {
            username: Some(user.username.clone()),
            flashes,
            categories: CategoryCode::ALL.to_vec(),
        }
    }

    /// Layout for the login and registration pages.
    #[must_use]
    pub fn anonymous(Flashes(flashes): Flashes) -> Self {
        Self {
            username: None,
            flashes,
            categories: Vec::new(),
        }
    }
}

/// `?prod_id=` query carried by the cart and wishlist endpoints.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub prod_id: Option<String>,
}

impl ProductQuery {
    /// The requested product id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the id is missing or not a number.
    pub fn product_id(&self) -> Result<ProductId, AppError> {
        let raw = self
            .prod_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("missing prod_id".to_owned()))?;
        raw.trim()
            .parse()
            .map_err(|_| AppError::BadRequest(format!("invalid prod_id: {raw:?}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(raw: Option<&str>) -> ProductQuery {
        ProductQuery {
            prod_id: raw.map(str::to_owned),
        }
    }

    #[test]
    fn test_product_id_parses() {
        assert_eq!(query(Some(" 42 ")).product_id().unwrap().as_i64(), 42);
    }

    #[test]
    fn test_malformed_product_id_is_bad_request() {
        assert!(matches!(
            query(Some("abc")).product_id(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(query(None).product_id(), Err(AppError::BadRequest(_))));
    }
}
