//! Cart route handlers.
//!
//! Every mutation is a single SQL statement in [`CartRepository`]; these
//! handlers only parse the product id and pick the next page. Plus/minus are
//! called from `cart.js` and answer with JSON.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Serialize;

use selldesk_core::{CartLine, CartSummary, LineAdjustment, Money, ProductId, UserId};

use crate::db::CartRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Flashes, RequireAuth};
use crate::routes::{Layout, ProductQuery};
use crate::state::AppState;

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/cart.html")]
pub struct CartTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLine>,
    pub summary: CartSummary,
}

/// Body of the plus/minus responses.
#[derive(Debug, Serialize)]
pub struct CartUpdate {
    pub quantity: i32,
    pub line_total: Money,
    pub amount: Money,
    pub shipping: Money,
    pub total: Money,
}

impl CartUpdate {
    /// Totals after `product_id` changed, priced from the reloaded cart.
    fn from_lines(lines: &[CartLine], product_id: ProductId, shipping_fee: Money) -> Option<Self> {
        let line = lines.iter().find(|l| l.product_id == product_id)?;
        let summary = CartSummary::compute(lines, shipping_fee);
        Some(Self {
            quantity: line.quantity,
            line_total: line.line_total(),
            amount: summary.amount,
            shipping: summary.shipping,
            total: summary.total,
        })
    }
}

/// Display the cart page.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    flashes: Flashes,
) -> Result<impl IntoResponse> {
    let lines = CartRepository::new(state.pool()).lines(user.id).await?;
    let summary = CartSummary::compute(&lines, state.config().shipping_fee);

    Ok(CartTemplate {
        layout: Layout::new(&user, flashes),
        lines,
        summary,
    })
}

/// Add a product to the cart, or bump its quantity.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse> {
    let product_id = query.product_id()?;
    let quantity = CartRepository::new(state.pool())
        .add_or_increment(user.id, product_id)
        .await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", product_id.to_string()),
            ("quantity", quantity.to_string()),
        ],
    );
    Ok(Redirect::to("/cart"))
}

/// Put exactly one unit of a product in the cart and go to checkout.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn buy_now(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse> {
    let product_id = query.product_id()?;
    CartRepository::new(state.pool())
        .set_quantity_for_buy_now(user.id, product_id)
        .await?;

    add_breadcrumb(
        "cart",
        "Buy now",
        &[("product_id", product_id.to_string())],
    );
    Ok(Redirect::to("/checkout"))
}

/// Increase a line's quantity by one.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn plus(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProductQuery>,
) -> Result<Json<CartUpdate>> {
    adjust(&state, user.id, &query, LineAdjustment::Increment).await
}

/// Decrease a line's quantity by one, never below one.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn minus(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProductQuery>,
) -> Result<Json<CartUpdate>> {
    adjust(&state, user.id, &query, LineAdjustment::Decrement).await
}

async fn adjust(
    state: &AppState,
    user_id: UserId,
    query: &ProductQuery,
    adjustment: LineAdjustment,
) -> Result<Json<CartUpdate>> {
    let product_id = query.product_id()?;
    let repo = CartRepository::new(state.pool());

    repo.adjust(user_id, product_id, adjustment).await?;
    let lines = repo.lines(user_id).await?;

    // The line can vanish between the two statements if another tab removed it
    CartUpdate::from_lines(&lines, product_id, state.config().shipping_fee)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("cart line for product {product_id}")))
}

/// Remove a product from the cart and return to checkout.
///
/// Removing a product that isn't in the cart is not an error.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse> {
    let product_id = query.product_id()?;
    let removed = CartRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;

    tracing::debug!(%product_id, removed, "Cart line removed");
    Ok(Redirect::to("/checkout"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn line(id: i64, quantity: i32, price: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            title: format!("Product {id}"),
            image: String::new(),
            unit_price: Money::rupees(price),
            quantity,
        }
    }

    #[test]
    fn test_update_prices_whole_cart() {
        let lines = [line(1, 2, 50), line(2, 1, 30)];
        let update = CartUpdate::from_lines(&lines, ProductId::new(1), Money::rupees(40)).unwrap();

        assert_eq!(update.quantity, 2);
        assert_eq!(update.line_total, Money::rupees(100));
        assert_eq!(update.amount, Money::rupees(130));
        assert_eq!(update.shipping, Money::rupees(40));
        assert_eq!(update.total.amount(), Decimal::from(170));
    }

    #[test]
    fn test_update_for_missing_line_is_none() {
        let lines = [line(1, 1, 50)];
        assert!(CartUpdate::from_lines(&lines, ProductId::new(9), Money::rupees(40)).is_none());
    }

    #[test]
    fn test_update_serializes_expected_keys() {
        let lines = [line(1, 1, 50)];
        let update = CartUpdate::from_lines(&lines, ProductId::new(1), Money::rupees(40)).unwrap();
        let json = serde_json::to_value(&update).unwrap();
        for key in ["quantity", "line_total", "amount", "shipping", "total"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
