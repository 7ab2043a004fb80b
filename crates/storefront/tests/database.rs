//! Repository and checkout tests against a real `PostgreSQL` database.
//!
//! Each test gets a fresh database with the crate migrations applied.
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

#![allow(clippy::unwrap_used)]

mod common;

use sqlx::PgPool;

use std::time::Duration;

use selldesk_core::{
    CartSummary, CategoryCode, CheckoutError, CheckoutSelection, LineAdjustment, Money, OrderId,
    OrderStatus, ProductId, SearchQuery, UserId,
};
use selldesk_storefront::db::{
    CartRepository, OrderRepository, ProductRepository, RepositoryError, WishlistRepository,
};
use selldesk_storefront::config::NotificationPolicy;
use selldesk_storefront::services::checkout::PlaceOrderError;
use selldesk_storefront::services::{CheckoutService, EmailService, PlacedOrder};

use common::{create_address, create_product, create_user};

fn checkout(pool: &PgPool) -> CheckoutService<'_> {
    CheckoutService::new(pool, Money::rupees(40))
}

/// Wait until some other session in this database is blocked on a row lock.
async fn wait_for_lock_wait(pool: &PgPool) {
    for _ in 0..200 {
        let waiting: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pg_stat_activity
             WHERE datname = current_database() AND wait_event_type = 'Lock'",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        if waiting > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no session started waiting on a lock");
}

// =============================================================================
// Cart
// =============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_adding_twice_increments_quantity(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    let cart = CartRepository::new(&pool);

    assert_eq!(cart.add_or_increment(user, milk).await.unwrap(), 1);
    assert_eq!(cart.add_or_increment(user, milk).await.unwrap(), 2);

    let lines = cart.lines(user).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().unwrap().quantity, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_buy_now_resets_quantity_to_one(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    let cart = CartRepository::new(&pool);

    cart.add_or_increment(user, milk).await.unwrap();
    cart.add_or_increment(user, milk).await.unwrap();
    assert_eq!(cart.set_quantity_for_buy_now(user, milk).await.unwrap(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_minus_never_drops_below_one(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    let cart = CartRepository::new(&pool);

    cart.add_or_increment(user, milk).await.unwrap();
    assert_eq!(
        cart.adjust(user, milk, LineAdjustment::Decrement).await.unwrap(),
        1
    );
    assert_eq!(
        cart.adjust(user, milk, LineAdjustment::Increment).await.unwrap(),
        2
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_missing_lines_and_products(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    let cart = CartRepository::new(&pool);

    assert!(matches!(
        cart.adjust(user, milk, LineAdjustment::Increment).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(!cart.remove(user, milk).await.unwrap());
    assert!(matches!(
        cart.add_or_increment(user, ProductId::new(999_999)).await,
        Err(RepositoryError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_carts_are_per_account(pool: PgPool) {
    let asha = create_user(&pool, "asha").await;
    let ravi = create_user(&pool, "ravi").await;
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    let cart = CartRepository::new(&pool);

    cart.add_or_increment(asha, milk).await.unwrap();

    assert!(cart.lines(ravi).await.unwrap().is_empty());
    assert!(matches!(
        cart.adjust(ravi, milk, LineAdjustment::Increment).await,
        Err(RepositoryError::NotFound)
    ));
}

// =============================================================================
// Checkout
// =============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_place_order_snapshots_cart(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let paneer = create_product(&pool, "Malai Paneer", CategoryCode::Paneer, 50).await;
    let lassi = create_product(&pool, "Sweet Lassi", CategoryCode::Lassi, 30).await;
    let profile = create_address(&pool, user).await;

    let cart = CartRepository::new(&pool);
    cart.add_or_increment(user, paneer).await.unwrap();
    cart.add_or_increment(user, paneer).await.unwrap();
    cart.add_or_increment(user, lassi).await.unwrap();

    let lines = cart.lines(user).await.unwrap();
    assert_eq!(
        CartSummary::compute(&lines, Money::rupees(40)).total,
        Money::rupees(170)
    );

    let service = checkout(&pool);
    let selection = service.select_address(user, profile.id).await.unwrap();
    let placed = service.place_order(user, Some(selection)).await.unwrap();

    assert_eq!(placed.total, Money::rupees(170));
    assert_eq!(placed.lines, 2);
    assert!(cart.lines(user).await.unwrap().is_empty());

    let order = OrderRepository::new(&pool)
        .get_for_user(user, placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.amount, Money::rupees(170));
    assert!(order.paid);
    assert_eq!(order.status, OrderStatus::Placed);
    assert!(order.shipping_address.contains("Pune"));

    let quantities: Vec<_> = order
        .lines
        .iter()
        .map(|l| (l.product_id, l.quantity, l.unit_price))
        .collect();
    assert_eq!(
        quantities,
        [
            (paneer, 2, Money::rupees(50)),
            (lassi, 1, Money::rupees(30)),
        ]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_empty_cart_places_nothing(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let profile = create_address(&pool, user).await;

    let service = checkout(&pool);
    let selection = service.select_address(user, profile.id).await.unwrap();

    assert!(matches!(
        service.place_order(user, Some(selection)).await,
        Err(PlaceOrderError::Checkout(CheckoutError::EmptyCart))
    ));
    assert!(
        OrderRepository::new(&pool)
            .list_for_user(user)
            .await
            .unwrap()
            .is_empty()
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_missing_selection_keeps_cart(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    create_address(&pool, user).await;
    let cart = CartRepository::new(&pool);
    cart.add_or_increment(user, milk).await.unwrap();

    assert!(matches!(
        checkout(&pool).place_order(user, None).await,
        Err(PlaceOrderError::Checkout(CheckoutError::NoAddressSelected))
    ));
    assert_eq!(cart.lines(user).await.unwrap().len(), 1);
    assert!(
        OrderRepository::new(&pool)
            .list_for_user(user)
            .await
            .unwrap()
            .is_empty()
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_foreign_address_is_rejected(pool: PgPool) {
    let asha = create_user(&pool, "asha").await;
    let ravi = create_user(&pool, "ravi").await;
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    let ravis_address = create_address(&pool, ravi).await;
    CartRepository::new(&pool)
        .add_or_increment(asha, milk)
        .await
        .unwrap();

    let service = checkout(&pool);
    assert!(matches!(
        service.select_address(asha, ravis_address.id).await,
        Err(PlaceOrderError::Checkout(CheckoutError::Unauthorized))
    ));

    // A forged selection is caught again at placement
    let forged = CheckoutSelection::new(asha, ravis_address.id, chrono::Utc::now());
    assert!(matches!(
        service.place_order(asha, Some(forged)).await,
        Err(PlaceOrderError::Checkout(CheckoutError::Unauthorized))
    ));
    assert_eq!(
        CartRepository::new(&pool).lines(asha).await.unwrap().len(),
        1
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_line_added_during_placement_stays_in_cart(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let paneer = create_product(&pool, "Malai Paneer", CategoryCode::Paneer, 50).await;
    let lassi = create_product(&pool, "Sweet Lassi", CategoryCode::Lassi, 30).await;
    let profile = create_address(&pool, user).await;
    let cart = CartRepository::new(&pool);
    cart.add_or_increment(user, paneer).await.unwrap();

    let selection = checkout(&pool)
        .select_address(user, profile.id)
        .await
        .unwrap();

    // Hold the address row so placement stops right after locking the cart
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM storefront.profile WHERE id = $1 FOR UPDATE")
        .bind(profile.id)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let placing = tokio::spawn({
        let pool = pool.clone();
        async move {
            CheckoutService::new(&pool, Money::rupees(40))
                .place_order(user, Some(selection))
                .await
        }
    });
    wait_for_lock_wait(&pool).await;

    cart.add_or_increment(user, lassi).await.unwrap();
    blocker.commit().await.unwrap();

    let placed = placing.await.unwrap().unwrap();
    assert_eq!(placed.lines, 1);
    assert_eq!(placed.total, Money::rupees(90));

    let order = OrderRepository::new(&pool)
        .get_for_user(user, placed.order_id)
        .await
        .unwrap()
        .unwrap();
    let ordered: Vec<_> = order.lines.iter().map(|l| l.product_id).collect();
    assert_eq!(ordered, [paneer]);

    let remaining: Vec<_> = cart
        .lines(user)
        .await
        .unwrap()
        .iter()
        .map(|l| (l.product_id, l.quantity))
        .collect();
    assert_eq!(remaining, [(lassi, 1)]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_concurrent_placements_consume_cart_once(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    let profile = create_address(&pool, user).await;
    CartRepository::new(&pool)
        .add_or_increment(user, milk)
        .await
        .unwrap();

    let service = checkout(&pool);
    let selection = service.select_address(user, profile.id).await.unwrap();

    let (first, second) = tokio::join!(
        service.place_order(user, Some(selection)),
        service.place_order(user, Some(selection)),
    );

    let results = [first, second];
    let placed = results.iter().filter(|r| r.is_ok()).count();
    let empty = results
        .iter()
        .filter(|r| matches!(r, Err(PlaceOrderError::Checkout(CheckoutError::EmptyCart))))
        .count();
    assert_eq!((placed, empty), (1, 1));

    let orders = OrderRepository::new(&pool).list_for_user(user).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders.first().unwrap().amount, Money::rupees(70));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_confirmation_failure_follows_policy(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let email = EmailService::log_only("http://localhost:3000");
    let service = checkout(&pool);
    let order = PlacedOrder {
        order_id: OrderId::new(1),
        total: Money::rupees(70),
        lines: 1,
    };

    assert!(
        service
            .notify(&email, NotificationPolicy::Warn, user, &order)
            .await
            .is_none()
    );

    let missing = UserId::new(i64::MAX);
    assert!(
        service
            .notify(&email, NotificationPolicy::Warn, missing, &order)
            .await
            .is_some()
    );
    assert!(
        service
            .notify(&email, NotificationPolicy::Suppress, missing, &order)
            .await
            .is_none()
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_order_status_update(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    let profile = create_address(&pool, user).await;
    CartRepository::new(&pool)
        .add_or_increment(user, milk)
        .await
        .unwrap();

    let service = checkout(&pool);
    let selection = service.select_address(user, profile.id).await.unwrap();
    let placed = service.place_order(user, Some(selection)).await.unwrap();

    let orders = OrderRepository::new(&pool);
    orders
        .set_status(placed.order_id, OrderStatus::Shipped)
        .await
        .unwrap();

    let order = orders
        .get_for_user(user, placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);
    assert_eq!(order.amount, Money::rupees(70));
}

// =============================================================================
// Wishlist
// =============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_wishlist_add_is_idempotent(pool: PgPool) {
    let user = create_user(&pool, "asha").await;
    let ghee = create_product(&pool, "Cow Ghee", CategoryCode::Ghee, 500).await;
    let wishlist = WishlistRepository::new(&pool);

    assert!(wishlist.add(user, ghee).await.unwrap());
    assert!(!wishlist.add(user, ghee).await.unwrap());
    assert_eq!(wishlist.list(user).await.unwrap().len(), 1);
    assert!(wishlist.contains(user, ghee).await.unwrap());

    assert!(wishlist.remove(user, ghee).await.unwrap());
    assert!(!wishlist.remove(user, ghee).await.unwrap());
    assert!(!wishlist.contains(user, ghee).await.unwrap());
}

// =============================================================================
// Catalog
// =============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_search_matches_titles_and_category_names(pool: PgPool) {
    let milk = create_product(&pool, "Toned Milk", CategoryCode::Milk, 30).await;
    let shake = create_product(&pool, "Chocolate Shake", CategoryCode::MilkShake, 45).await;
    let ghee = create_product(&pool, "Cow Ghee", CategoryCode::Ghee, 500).await;
    let products = ProductRepository::new(&pool);

    let ids = |found: Vec<selldesk_storefront::models::Product>| -> Vec<ProductId> {
        found.into_iter().map(|p| p.id).collect()
    };

    let found = products
        .search(&SearchQuery::parse("milk").unwrap())
        .await
        .unwrap();
    assert_eq!(ids(found), [milk, shake]);

    let found = products
        .search(&SearchQuery::parse("GHEE").unwrap())
        .await
        .unwrap();
    assert_eq!(ids(found), [ghee]);

    let found = products
        .search(&SearchQuery::parse("100%").unwrap())
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
async fn test_title_lookup_prefers_lowest_id(pool: PgPool) {
    let first = create_product(&pool, "Plain Curd", CategoryCode::Curd, 40).await;
    create_product(&pool, "Plain Curd", CategoryCode::Curd, 45).await;
    let products = ProductRepository::new(&pool);

    assert_eq!(products.get_by_title("Plain Curd").await.unwrap().id, first);
    assert!(matches!(
        products.get_by_title("Nothing").await,
        Err(RepositoryError::NotFound)
    ));
    // Every product in the category is listed, duplicates included
    assert_eq!(
        products.list_titles(CategoryCode::Curd).await.unwrap(),
        ["Plain Curd", "Plain Curd"]
    );
}
