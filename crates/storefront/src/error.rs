//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, AppError>`. Checkout and form errors
//! become a redirect carrying a flash message; missing resources are 404;
//! infrastructure failures are captured to Sentry and answered with a
//! generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use selldesk_core::CheckoutError;

use crate::db::RepositoryError;
use crate::middleware::Flash;
use crate::models::FlashMessage;
use crate::services::{AuthError, AvatarError, PlaceOrderError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout precondition failed (empty cart, missing address, ...).
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Form input rejected; the user is sent back to `redirect_to`.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        redirect_to: String,
    },

    /// Malformed request (e.g. a non-numeric product id).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Avatar upload failed.
    #[error("Avatar error: {0}")]
    Avatar(#[from] AvatarError),
}

impl AppError {
    /// A validation error that sends the user back to `redirect_to`.
    pub fn validation(message: impl Into<String>, redirect_to: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            redirect_to: redirect_to.into(),
        }
    }

    /// Whether this is a server-side failure worth reporting.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(RepositoryError::NotFound | RepositoryError::Conflict(_)) => false,
            Self::Auth(err) => !err.is_user_error(),
            Self::Avatar(err) => !err.is_user_error(),
            Self::Database(_) | Self::Session(_) => true,
            Self::Checkout(_) | Self::NotFound(_) | Self::Validation { .. } | Self::BadRequest(_) => {
                false
            }
        }
    }
}

impl From<PlaceOrderError> for AppError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::Checkout(e) => Self::Checkout(e),
            PlaceOrderError::Repository(e) => Self::Database(e),
        }
    }
}

/// Where a checkout error sends the shopper.
const fn checkout_redirect(err: CheckoutError) -> Option<&'static str> {
    match err {
        CheckoutError::EmptyCart => Some("/home"),
        CheckoutError::NoAddressSelected | CheckoutError::AddressNotFound => {
            Some("/confirm-address")
        }
        CheckoutError::IncompleteAddress => Some("/address"),
        CheckoutError::Unauthorized => None,
    }
}

fn redirect_with_flash(message: &str, to: &str) -> Response {
    (Flash(FlashMessage::error(sentence_case(message))), Redirect::to(to)).into_response()
}

/// Upper-case the first letter; error `Display` texts start lower-case.
fn sentence_case(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match self {
            Self::Checkout(err) => match checkout_redirect(err) {
                Some(to) => redirect_with_flash(&err.to_string(), to),
                None => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            },
            Self::Validation {
                message,
                redirect_to,
            } => redirect_with_flash(&message, &redirect_to),
            Self::Avatar(err) if err.is_user_error() => {
                redirect_with_flash(&err.to_string(), "/profile")
            }
            Self::NotFound(_) | Self::Database(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, "Not found").into_response()
            }
            Self::Database(RepositoryError::Conflict(message)) => {
                (StatusCode::CONFLICT, message).into_response()
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Auth(err) if err.is_user_error() => {
                (StatusCode::BAD_REQUEST, err.to_string()).into_response()
            }
            // Don't expose internal error details to clients
            Self::Database(_)
            | Self::Auth(_)
            | Self::Session(_)
            | Self::Avatar(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a shopper action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}
