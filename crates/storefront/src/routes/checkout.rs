//! Checkout route handlers: summary, address confirmation, payment and
//! order placement.
//!
//! The chosen address travels in the session as a
//! [`selldesk_core::CheckoutSelection`]; [`CheckoutService::place_order`]
//! receives it explicitly.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use selldesk_core::{CartLine, CartSummary, CheckoutError, OrderId, ProfileId};

use crate::db::{CartRepository, OrderRepository, ProfileRepository};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Flash, Flashes, RequireAuth};
use crate::models::{CurrentUser, Order, Profile};
use crate::routes::Layout;
use crate::services::CheckoutService;
use crate::services::checkout::{clear_selection, load_selection, store_selection};
use crate::state::AppState;

// =============================================================================
// Form and Query Types
// =============================================================================

/// Confirm-address form data.
#[derive(Debug, Deserialize)]
pub struct ConfirmAddressForm {
    pub address: Option<String>,
}

/// Order success query parameters.
#[derive(Debug, Deserialize)]
pub struct OrderSuccessQuery {
    pub order_id: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout summary template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/checkout.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLine>,
    pub summary: CartSummary,
}

/// One selectable address on the confirm-address page.
pub struct AddressChoice {
    pub id: ProfileId,
    pub summary: String,
    pub complete: bool,
    pub selected: bool,
}

impl AddressChoice {
    fn new(profile: &Profile, selected: Option<ProfileId>) -> Self {
        Self {
            id: profile.id,
            summary: profile.address.one_line(),
            complete: profile.address.is_complete(),
            selected: selected == Some(profile.id),
        }
    }
}

/// Address confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirm_address.html")]
pub struct ConfirmAddressTemplate {
    pub layout: Layout,
    pub addresses: Vec<AddressChoice>,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLine>,
    pub summary: CartSummary,
    /// The selected delivery address, if one is still valid.
    pub address: Option<Profile>,
}

/// Order success template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/order_success.html")]
pub struct OrderSuccessTemplate {
    pub layout: Layout,
    pub order: Option<Order>,
}

// =============================================================================
// Helpers
// =============================================================================

/// The shopper's cart lines, or `EmptyCart`.
async fn non_empty_cart(state: &AppState, user: &CurrentUser) -> Result<Vec<CartLine>> {
    let lines = CartRepository::new(state.pool()).lines(user.id).await?;
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }
    Ok(lines)
}

// =============================================================================
// Routes
// =============================================================================

/// Display the checkout summary.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    flashes: Flashes,
) -> Result<impl IntoResponse> {
    let lines = CartRepository::new(state.pool()).lines(user.id).await?;
    let summary = CartSummary::compute(&lines, state.config().shipping_fee);

    Ok(CheckoutTemplate {
        layout: Layout::new(&user, flashes),
        lines,
        summary,
    })
}

/// List the shopper's addresses for selection.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn confirm_address_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    flashes: Flashes,
) -> Result<impl IntoResponse> {
    non_empty_cart(&state, &user).await?;

    let selected = load_selection(&session, user.id, state.config().checkout_ttl)
        .await?
        .map(|s| s.address);
    let addresses = ProfileRepository::new(state.pool())
        .list_for_user(user.id)
        .await?
        .iter()
        .map(|profile| AddressChoice::new(profile, selected))
        .collect();

    Ok(ConfirmAddressTemplate {
        layout: Layout::new(&user, flashes),
        addresses,
    })
}

/// Select a delivery address and continue to payment.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn confirm_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<ConfirmAddressForm>,
) -> Result<Response> {
    non_empty_cart(&state, &user).await?;

    let raw = form
        .address
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CheckoutError::NoAddressSelected)?;
    let address: ProfileId = raw.parse().map_err(|_| CheckoutError::AddressNotFound)?;

    let selection = CheckoutService::new(state.pool(), state.config().shipping_fee)
        .select_address(user.id, address)
        .await?;
    store_selection(&session, selection).await?;

    add_breadcrumb(
        "checkout",
        "Address selected",
        &[("address_id", address.to_string())],
    );
    Ok(Redirect::to("/payment").into_response())
}

/// Display the payment page. An empty cart goes back home.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    flashes: Flashes,
) -> Result<impl IntoResponse> {
    let lines = non_empty_cart(&state, &user).await?;
    let summary = CartSummary::compute(&lines, state.config().shipping_fee);

    let address = match load_selection(&session, user.id, state.config().checkout_ttl).await? {
        Some(selection) => ProfileRepository::new(state.pool())
            .get_by_id(selection.address)
            .await?
            .filter(|p| p.user_id == user.id),
        None => None,
    };

    Ok(PaymentTemplate {
        layout: Layout::new(&user, flashes),
        lines,
        summary,
        address,
    })
}

/// `GET /place-order` has nothing to place.
pub async fn place_order_redirect() -> Redirect {
    Redirect::to("/payment")
}

/// Place the order, then clear the selection and send the confirmation.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let selection = load_selection(&session, user.id, state.config().checkout_ttl).await?;
    let service = CheckoutService::new(state.pool(), state.config().shipping_fee);

    let placed = service.place_order(user.id, selection).await?;

    if let Err(e) = clear_selection(&session).await {
        tracing::warn!(error = %e, "Failed to clear checkout selection");
    }

    add_breadcrumb(
        "checkout",
        "Order placed",
        &[
            ("order_id", placed.order_id.to_string()),
            ("total", placed.total.to_string()),
        ],
    );

    let warning = service
        .notify(
            state.email(),
            state.config().order_email_failure,
            user.id,
            &placed,
        )
        .await;

    let redirect = Redirect::to(&format!("/order-success?order_id={}", placed.order_id));
    Ok(match warning {
        Some(message) => (Flash(message), redirect).into_response(),
        None => redirect.into_response(),
    })
}

/// Display the order confirmation.
///
/// Orders belonging to someone else are not shown.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn order_success(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    flashes: Flashes,
    Query(query): Query<OrderSuccessQuery>,
) -> Result<impl IntoResponse> {
    let order_id = query
        .order_id
        .as_deref()
        .and_then(|raw| raw.parse::<OrderId>().ok());

    let order = match order_id {
        Some(id) => {
            OrderRepository::new(state.pool())
                .get_for_user(user.id, id)
                .await?
        }
        None => None,
    };

    Ok(OrderSuccessTemplate {
        layout: Layout::new(&user, flashes),
        order,
    })
}
