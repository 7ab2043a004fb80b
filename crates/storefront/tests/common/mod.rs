//! Shared fixtures for the storefront integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use selldesk_core::{CategoryCode, Email, Money, ProductId, ShippingAddress, UserId};
use selldesk_storefront::config::{NotificationPolicy, StorefrontConfig};
use selldesk_storefront::db::catalog::NewProduct;
use selldesk_storefront::db::{ProductRepository, ProfileRepository, UserRepository};
use selldesk_storefront::models::Profile;

pub const BASE_URL: &str = "http://localhost:3000";

pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/selldesk_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: BASE_URL.to_owned(),
        shipping_fee: Money::rupees(40),
        checkout_ttl: chrono::Duration::minutes(30),
        media_dir: std::env::temp_dir().join("selldesk-test-media"),
        order_email_failure: NotificationPolicy::Warn,
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A pool that never connects; for routes that reject before touching the
/// database.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/selldesk_test")
        .unwrap()
}

pub async fn create_user(pool: &PgPool, username: &str) -> UserId {
    let email = Email::parse(&format!("{username}@example.com")).unwrap();
    UserRepository::new(pool)
        .create_with_password(username, &email, "not-a-real-hash")
        .await
        .unwrap()
        .id
}

pub async fn create_product(pool: &PgPool, title: &str, category: CategoryCode, price: u32) -> ProductId {
    ProductRepository::new(pool)
        .insert(&NewProduct {
            category,
            subcategory: None,
            title: title.to_owned(),
            selling_price: Money::rupees(price + 10),
            discounted_price: Money::rupees(price),
            image: String::new(),
            description: format!("{title} description"),
            composition: String::new(),
            product_application: String::new(),
        })
        .await
        .unwrap()
}

pub async fn create_address(pool: &PgPool, user: UserId) -> Profile {
    let address =
        ShippingAddress::from_form("Asha Rao", "MG Road", "Pune", "Maharashtra", "411001").unwrap();
    ProfileRepository::new(pool)
        .update_address(user, &address)
        .await
        .unwrap()
}
