//! Request errors and Sentry context helpers.
//!
//! Most failures on this site become flash notices. `AppError` covers the
//! rest: session store faults and backend calls a handler cannot recover
//! from. Server-side variants are captured to Sentry before responding.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::supabase::BackendError;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Session store read or write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
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

        let status = match &self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::EmailNotConfirmed => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Backend(err) => backend_status(err),
                AuthError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        let message = match &self {
            Self::Session(_) => "Internal server error".to_string(),
            Self::Auth(AuthError::Backend(BackendError::RateLimited(_))) => {
                "Too many requests".to_string()
            }
            Self::Auth(err) => err.user_message(),
        };

        (status, message).into_response()
    }
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Session(_) | Self::Auth(AuthError::Session(_)) => true,
            Self::Auth(AuthError::Backend(err)) => backend_status(err).is_server_error(),
            Self::Auth(_) => false,
        }
    }
}

/// Status for a failed backend call.
///
/// Permission failures are passed through; anything else is a bad gateway.
fn backend_status(err: &BackendError) -> StatusCode {
    if err.is_unauthorized() {
        StatusCode::UNAUTHORIZED
    } else if err.is_permission_denied() {
        StatusCode::FORBIDDEN
    } else if matches!(err, BackendError::NotFound(_)) {
        StatusCode::NOT_FOUND
    } else if matches!(err, BackendError::RateLimited(_)) {
        StatusCode::TOO_MANY_REQUESTS
    } else {
        StatusCode::BAD_GATEWAY
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
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

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("navigation", "Viewed product page", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(err: BackendError) -> AppError {
        AppError::Auth(AuthError::Backend(err))
    }

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_backend_statuses() {
        assert_eq!(
            status_of(backend(BackendError::api(500, None, "boom"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(backend(BackendError::api(403, Some("42501"), "denied"))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(backend(BackendError::RateLimited(30))),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(
            status_of(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Auth(AuthError::UserAlreadyExists)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = backend(BackendError::api(500, None, "relation does not exist"));
        assert!(err.is_server_error());
        assert!(!AppError::Auth(AuthError::InvalidCredentials).is_server_error());
    }
}
