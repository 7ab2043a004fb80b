//! Wishlist route handlers.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header::REFERER},
    response::{IntoResponse, Redirect},
};
use url::Url;

use crate::db::WishlistRepository;
use crate::error::Result;
use crate::middleware::{Flash, RequireAuth};
use crate::models::FlashMessage;
use crate::routes::ProductQuery;
use crate::state::AppState;

/// Add a product to the wishlist and go back to the page the shopper was on.
///
/// Adding a product twice is a no-op.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse> {
    let product_id = query.product_id()?;
    let added = WishlistRepository::new(state.pool())
        .add(user.id, product_id)
        .await?;

    tracing::debug!(%product_id, added, "Wishlist add");
    let back = referer_path(&headers, &state.config().base_url)
        .unwrap_or_else(|| "/home".to_owned());
    Ok((
        Flash(FlashMessage::success("Added to wishlist ❤️")),
        Redirect::to(&back),
    ))
}

/// Remove a product from the wishlist. Removing a missing entry is not an error.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse> {
    let product_id = query.product_id()?;
    WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;

    Ok((
        Flash(FlashMessage::success("Removed from wishlist")),
        Redirect::to("/profile"),
    ))
}

/// Path and query of the `Referer`, only if it points back at this site.
fn referer_path(headers: &HeaderMap, base_url: &str) -> Option<String> {
    let referer = headers.get(REFERER)?.to_str().ok()?;
    let base = Url::parse(base_url).ok()?;
    let url = base.join(referer).ok()?;

    if url.origin() != base.origin() {
        return None;
    }

    let mut path = url.path().to_owned();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(path)
}
