//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username empty, too long, or containing disallowed characters.
    #[error("{0}")]
    InvalidUsername(String),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] selldesk_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Username already taken.
    #[error("a user with that username already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("the two password fields didn't match")]
    PasswordMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the error is caused by the submitted form rather than the server.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
