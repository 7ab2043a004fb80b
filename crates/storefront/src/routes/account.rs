//! Account route handlers: profile page, profile and address updates, and
//! avatar upload.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use selldesk_core::{CartLine, CartSummary, Email, STATES, ShippingAddress};

use crate::db::users::UserUpdate;
use crate::db::{
    CartRepository, OrderRepository, ProfileRepository, RepositoryError, UserRepository,
    WishlistRepository,
};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Flash, Flashes, RequireAuth};
use crate::models::{CurrentUser, FlashMessage, Order, Profile, User, WishlistItem, session_keys};
use crate::routes::Layout;
use crate::services::auth::validate_username;
use crate::services::avatars::MAX_AVATAR_BYTES;
use crate::state::AppState;

/// Request body limit for avatar uploads: the image plus multipart framing.
pub const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES + 64 * 1024;

/// Multipart field carrying the avatar image.
const AVATAR_FIELD: &str = "avatar";

// =============================================================================
// Form Types
// =============================================================================

/// Address fields, shared by the profile and address pages.
#[derive(Debug, Default, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zipcode: String,
}

impl AddressForm {
    fn parse(&self, page: &str) -> Result<ShippingAddress> {
        ShippingAddress::from_form(
            &self.name,
            &self.locality,
            &self.city,
            &self.state,
            &self.zipcode,
        )
        .map_err(|e| AppError::validation(e.to_string(), page))
    }
}

/// The profile page posts one of two forms, told apart by the submit button.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub submit_profile: Option<String>,
    pub submit_address: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub address: AddressForm,
}

// =============================================================================
// View Types
// =============================================================================

/// One option of the state dropdown.
pub struct StateOption {
    pub name: &'static str,
    pub selected: bool,
}

/// Prefilled address form.
pub struct AddressFormView {
    pub name: String,
    pub locality: String,
    pub city: String,
    pub zipcode: String,
    pub states: Vec<StateOption>,
}

impl From<&ShippingAddress> for AddressFormView {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            name: address.name.clone(),
            locality: address.locality.clone(),
            city: address.city.clone(),
            zipcode: address.zipcode.map(|z| z.to_string()).unwrap_or_default(),
            states: STATES
                .iter()
                .map(|&name| StateOption {
                    name,
                    selected: name == address.state,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub user: User,
    pub profile: Profile,
    pub address_form: AddressFormView,
    pub cart: Vec<CartLine>,
    pub summary: CartSummary,
    pub orders: Vec<Order>,
    pub wishlist: Vec<WishlistItem>,
}

/// Address page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/address.html")]
pub struct AddressTemplate {
    pub layout: Layout,
    pub profile: Profile,
    pub address_form: AddressFormView,
}

// =============================================================================
// Profile Routes
// =============================================================================

/// Display the profile page.
#[tracing::instrument(skip_all, fields(user_id = %current.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    flashes: Flashes,
) -> Result<impl IntoResponse> {
    let pool = state.pool();

    let user = UserRepository::new(pool)
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", current.id)))?;
    let profile = ProfileRepository::new(pool).get_or_create(current.id).await?;
    let cart = CartRepository::new(pool).lines(current.id).await?;
    let summary = CartSummary::compute(&cart, state.config().shipping_fee);
    let orders = OrderRepository::new(pool).list_for_user(current.id).await?;
    let wishlist = WishlistRepository::new(pool).list(current.id).await?;

    Ok(ProfileTemplate {
        layout: Layout::new(&current, flashes),
        address_form: AddressFormView::from(&profile.address),
        user,
        profile,
        cart,
        summary,
        orders,
        wishlist,
    })
}

/// Handle the profile page's profile or address form.
#[tracing::instrument(skip_all, fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    if form.submit_address.is_some() {
        let address = form.address.parse("/profile")?;
        ProfileRepository::new(state.pool())
            .update_address(current.id, &address)
            .await?;

        return Ok(saved("Address updated successfully.", "/profile"));
    }

    if form.submit_profile.is_some() {
        update_user_fields(&state, &current, &session, &form).await?;
        return Ok(saved("Profile updated successfully.", "/profile"));
    }

    Ok(Redirect::to("/profile").into_response())
}

async fn update_user_fields(
    state: &AppState,
    current: &CurrentUser,
    session: &Session,
    form: &ProfileForm,
) -> Result<()> {
    let invalid = |message: String| AppError::validation(message, "/profile");

    let username = validate_username(form.username.as_deref().unwrap_or_default())
        .map_err(|e| invalid(e.to_string()))?;
    let email = Email::parse(form.email.as_deref().unwrap_or_default())
        .map_err(|e| invalid(format!("invalid email: {e}")))?;

    let user = UserRepository::new(state.pool())
        .update_profile(
            current.id,
            &UserUpdate {
                username,
                email: &email,
                first_name: form.first_name.as_deref().unwrap_or_default().trim(),
                last_name: form.last_name.as_deref().unwrap_or_default().trim(),
            },
        )
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(message) => invalid(message),
            other => other.into(),
        })?;

    // The navigation bar shows the username from the session
    session
        .insert(
            session_keys::CURRENT_USER,
            CurrentUser {
                id: user.id,
                username: user.username,
            },
        )
        .await?;
    Ok(())
}

/// Store an uploaded avatar and delete the one it replaces.
#[tracing::instrument(skip_all, fields(user_id = %current.id))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some(AVATAR_FIELD) {
            bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?,
            );
            break;
        }
    }
    let bytes = bytes.unwrap_or_default();

    let path = state.avatars().save(&bytes).await?;
    let previous = match ProfileRepository::new(state.pool())
        .set_avatar(current.id, &path)
        .await
    {
        Ok(previous) => previous,
        Err(e) => {
            state.avatars().remove(&path).await;
            return Err(e.into());
        }
    };

    if let Some(previous) = previous.filter(|p| *p != path) {
        state.avatars().remove(&previous).await;
    }

    add_breadcrumb("account", "Avatar updated", &[("path", path)]);
    Ok(saved("Profile picture updated.", "/profile"))
}

// =============================================================================
// Address Routes
// =============================================================================

/// Display the standalone address page.
#[tracing::instrument(skip_all, fields(user_id = %current.id))]
pub async fn address_page(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    flashes: Flashes,
) -> Result<impl IntoResponse> {
    let profile = ProfileRepository::new(state.pool())
        .get_or_create(current.id)
        .await?;

    Ok(AddressTemplate {
        layout: Layout::new(&current, flashes),
        address_form: AddressFormView::from(&profile.address),
        profile,
    })
}

/// Save the address from the standalone address page.
#[tracing::instrument(skip_all, fields(user_id = %current.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let address = form.parse("/address")?;
    ProfileRepository::new(state.pool())
        .update_address(current.id, &address)
        .await?;

    Ok(saved("Address saved successfully.", "/address"))
}

fn saved(message: &str, to: &str) -> Response {
    (Flash(FlashMessage::success(message)), Redirect::to(to)).into_response()
}
