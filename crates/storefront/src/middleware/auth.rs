//! Authentication extractors.
//!
//! Each extractor restores the visitor through [`AuthService::restore`], so
//! an expired access token is refreshed before the handler runs.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::CurrentUser;
use crate::services::auth::{AuthService, AuthState};
use crate::state::AppState;
use crate::supabase::Backend;

/// Extractor that requires a signed-in user.
///
/// If the visitor is not signed in, redirects to `/auth?next=<path>`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in admin.
///
/// Signed-out visitors go to `/auth`, signed-in non-admins to `/dashboard`.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Rejection from the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the sign-in page, returning to `next` afterwards.
    RedirectToLogin { next: String },
    /// Signed in, but not an admin.
    RedirectToDashboard,
    /// The session layer is missing from the stack.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => {
                Redirect::to(&format!("/auth?next={}", urlencoding::encode(&next))).into_response()
            }
            Self::RedirectToDashboard => Redirect::to("/dashboard").into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl AuthRejection {
    /// Login redirect back to the requested URI, including any nest prefix.
    fn login(parts: &Parts) -> Self {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |OriginalUri(uri)| uri);
        let next = uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), ToString::to_string);
        Self::RedirectToLogin { next }
    }
}

async fn restore<B: Backend>(parts: &Parts, state: &AppState<B>) -> Result<AuthState, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::MissingSession)?;
    Ok(AuthService::new(state.backend(), session).restore().await)
}

impl<B: Backend> FromRequestParts<AppState<B>> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<B>,
    ) -> Result<Self, Self::Rejection> {
        let auth = restore(parts, state).await?;
        auth.user.map(Self).ok_or_else(|| AuthRejection::login(parts))
    }
}

impl<B: Backend> FromRequestParts<AppState<B>> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<B>,
    ) -> Result<Self, Self::Rejection> {
        let auth = restore(parts, state).await?;
        match auth.user {
            Some(user) if auth.is_admin => Ok(Self(user)),
            Some(user) => {
                tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin hit admin page");
                Err(AuthRejection::RedirectToDashboard)
            }
            None => Err(AuthRejection::login(parts)),
        }
    }
}

impl<B: Backend> FromRequestParts<AppState<B>> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<B>,
    ) -> Result<Self, Self::Rejection> {
        let user = restore(parts, state).await.ok().and_then(|auth| auth.user);
        Ok(Self(user))
    }
}

/// A post-sign-in redirect target, or `/` if it is not a local path.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\") =>
        {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/cart")), "/cart");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_login_redirect_encodes_next() {
        let response = AuthRejection::RedirectToLogin {
            next: "/internship/1/apply?x=1".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/auth?next=%2Finternship%2F1%2Fapply%3Fx%3D1"
        );
    }
}
