//! Authentication error types.

use thiserror::Error;

use crate::supabase::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] pyrowarden_core::EmailError),

    /// Invalid credentials (wrong password or unknown user).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but its email address is not confirmed yet.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Session store read or write failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(BackendError),
}

impl From<BackendError> for AuthError {
    /// Classify GoTrue error codes; everything else stays a backend error.
    fn from(err: BackendError) -> Self {
        match err.code() {
            Some("invalid_credentials" | "invalid_grant") => Self::InvalidCredentials,
            Some("email_not_confirmed") => Self::EmailNotConfirmed,
            Some("user_already_exists" | "email_exists") => Self::UserAlreadyExists,
            Some("weak_password") => match err {
                BackendError::Api { message, .. } => Self::WeakPassword(message),
                other => Self::Backend(other),
            },
            _ => Self::Backend(err),
        }
    }
}

impl AuthError {
    /// Message safe to show on the sign-in page.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::EmailNotConfirmed => {
                "Please confirm your email address before signing in".to_string()
            }
            Self::UserAlreadyExists => "An account with this email already exists".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::Session(_) | Self::Backend(_) => {
                "Something went wrong, please try again".to_string()
            }
        }
    }
}
