//! End-to-end tests for the SellDesk storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and start the storefront
//! selldesk migrate
//! cargo run -p selldesk-storefront
//!
//! # Run the ignored end-to-end tests
//! cargo test -p selldesk-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_URL` - Server under test (default `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` / `DATABASE_URL` - Same database the server
//!   uses; products are seeded directly since shoppers cannot create them

#![allow(clippy::expect_used)]

use reqwest::{
    Client, Response, StatusCode,
    header::{HeaderMap, HeaderValue, LOCATION},
    redirect::Policy,
};
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use selldesk_core::{CategoryCode, Money, ProductId};
use selldesk_storefront::db::ProductRepository;
use selldesk_storefront::db::catalog::NewProduct;

/// Default storefront address.
pub const DEFAULT_STOREFRONT_URL: &str = "http://localhost:3000";

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "integration-pass-123";

/// One shopper's browser: a cookie jar that does not follow redirects.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// A fresh client with an empty cookie jar.
    ///
    /// Each context sends its own `X-Forwarded-For` address and therefore
    /// gets its own login rate-limit bucket.
    #[must_use]
    pub fn new() -> Self {
        let base_url = std::env::var("STOREFRONT_URL")
            .unwrap_or_else(|_| DEFAULT_STOREFRONT_URL.to_owned());

        let [a, b, c, ..] = *Uuid::new_v4().as_bytes();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_str(&format!("10.{a}.{b}.{c}")).expect("valid header value"),
        );

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .redirect(Policy::none())
            .build()
            .expect("Failed to build client");

        Self { client, base_url }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post(&self, path: &str) -> Response {
        self.client
            .post(self.url(path))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Register a new account with a unique username and log in as it.
    ///
    /// Returns the username.
    pub async fn register_and_login(&self) -> String {
        let username = format!("shopper_{}", Uuid::new_v4().simple());
        let email = format!("{username}@example.com");

        let resp = self
            .post_form(
                "/register",
                &[
                    ("username", username.as_str()),
                    ("email", email.as_str()),
                    ("password", TEST_PASSWORD),
                    ("password_confirm", TEST_PASSWORD),
                ],
            )
            .await;
        assert_redirect(&resp, "/login");

        let resp = self
            .post_form(
                "/login",
                &[("username", username.as_str()), ("password", TEST_PASSWORD)],
            )
            .await;
        assert_redirect(&resp, "/home");

        username
    }

    /// Save a complete delivery address for the logged-in shopper.
    pub async fn save_address(&self) {
        let resp = self
            .post_form(
                "/address",
                &[
                    ("name", "Asha Rao"),
                    ("locality", "MG Road"),
                    ("city", "Pune"),
                    ("state", "Maharashtra"),
                    ("zipcode", "411001"),
                ],
            )
            .await;
        assert_redirect(&resp, "/address");
    }
}

/// Assert a 303 redirect to `expected`.
///
/// # Panics
///
/// Panics if the response is not a redirect to `expected`.
pub fn assert_redirect(resp: &Response, expected: &str) {
    assert_eq!(resp.status(), StatusCode::SEE_OTHER, "expected redirect");
    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect without Location");
    assert_eq!(location, expected);
}

/// Connect to the storefront database.
///
/// # Panics
///
/// Panics if no database URL is set or the connection fails.
pub async fn connect_db() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL or DATABASE_URL must be set");

    selldesk_storefront::db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database")
}

/// Insert a product with a unique title.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_product(pool: &PgPool, category: CategoryCode, price: u32) -> ProductId {
    ProductRepository::new(pool)
        .insert(&NewProduct {
            category,
            subcategory: Some("Integration".to_owned()),
            title: format!("Test product {}", Uuid::new_v4().simple()),
            selling_price: Money::rupees(price + 10),
            discounted_price: Money::rupees(price),
            image: String::new(),
            description: "Seeded by the end-to-end tests.".to_owned(),
            composition: String::new(),
            product_application: String::new(),
        })
        .await
        .expect("Failed to seed product")
}

/// First address id offered on the confirm-address page.
#[must_use]
pub fn first_address_id(html: &str) -> Option<&str> {
    const MARKER: &str = r#"name="address" value=""#;
    let start = html.find(MARKER)? + MARKER.len();
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_address_id() {
        let html = r#"<input type="radio" name="address" value="17" checked>"#;
        assert_eq!(first_address_id(html), Some("17"));
        assert_eq!(first_address_id("<p>none</p>"), None);
    }
}
