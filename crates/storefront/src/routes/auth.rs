//! Authentication route handlers.
//!
//! Username/password login and registration backed by [`AuthService`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{Flash, Flashes, OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, FlashMessage};
use crate::routes::Layout;
use crate::services::{AuthError, AuthService};
use crate::services::auth::Registration;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Logged-in users go straight home.
pub async fn login_page(OptionalAuth(user): OptionalAuth, flashes: Flashes) -> Response {
    if user.is_some() {
        return Redirect::to("/home").into_response();
    }
    LoginTemplate {
        layout: Layout::anonymous(flashes),
    }
    .into_response()
}

/// Handle login form submission.
#[tracing::instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let user = AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
        .map_err(|e| {
            tracing::info!(error = %e, "Login rejected");
            form_error(e, "/login")
        })?;

    set_current_user(
        &session,
        &CurrentUser {
            id: user.id,
            username: user.username.clone(),
        },
    )
    .await?;
    set_sentry_user(&user.id, &user.username);

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Redirect::to("/home").into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(OptionalAuth(user): OptionalAuth, flashes: Flashes) -> Response {
    if user.is_some() {
        return Redirect::to("/home").into_response();
    }
    RegisterTemplate {
        layout: Layout::anonymous(flashes),
    }
    .into_response()
}

/// Handle registration form submission.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    AuthService::new(state.pool())
        .register(Registration {
            username: &form.username,
            email: &form.email,
            password: &form.password,
            password_confirm: &form.password_confirm,
        })
        .await
        .map_err(|e| form_error(e, "/register"))?;

    Ok((
        Flash(FlashMessage::success("Registration successful. Please login.")),
        Redirect::to("/login"),
    )
        .into_response())
}

/// Handle logout.
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/login").into_response())
}

/// Form mistakes go back to the form as a flash; server failures stay 500s.
fn form_error(err: AuthError, page: &str) -> AppError {
    if err.is_user_error() {
        AppError::validation(err.to_string(), page)
    } else {
        AppError::Auth(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_become_flashes() {
        let err = form_error(AuthError::PasswordMismatch, "/register");
        assert!(matches!(
            err,
            AppError::Validation { ref message, ref redirect_to }
                if message == "the two password fields didn't match" && redirect_to == "/register"
        ));
    }

    #[test]
    fn test_server_errors_stay_internal() {
        let err = form_error(AuthError::PasswordHash, "/login");
        assert!(matches!(err, AppError::Auth(AuthError::PasswordHash)));
    }
}
