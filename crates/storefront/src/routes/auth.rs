//! Authentication route handlers.
//!
//! One page carries both the sign-in and sign-up forms. Outcomes are reported
//! as flash notices.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{OptionalAuth, push_notice, safe_next};
use crate::models::Notice;
use crate::services::auth::{AuthError, AuthService, MIN_PASSWORD_LENGTH, SignUpResult};
use crate::state::AppState;
use crate::supabase::Backend;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub next: Option<String>,
}

/// Query parameters of the auth page.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    /// Where to go after signing in.
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-in / sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/page.html")]
pub struct AuthTemplate {
    pub layout: Layout,
    pub next: String,
    pub min_password_length: usize,
}

// =============================================================================
// Handlers
// =============================================================================

fn auth_page_url(next: &str) -> String {
    if next == "/" {
        "/auth".to_string()
    } else {
        format!("/auth?next={}", urlencoding::encode(next))
    }
}

/// Turn an auth failure into a notice, passing session failures up.
fn failure_notice(title: &str, err: AuthError) -> Result<Notice> {
    match err {
        AuthError::Session(e) => Err(AppError::Session(e)),
        AuthError::Backend(ref e) => {
            tracing::error!(error = %e, "Auth backend call failed");
            Ok(Notice::error(title, err.user_message()))
        }
        other => Ok(Notice::error(title, other.user_message())),
    }
}

/// Display the auth page. Signed-in visitors go straight to `next`.
pub async fn page(
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Query(query): Query<AuthQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref());
    if user.is_some() {
        return Redirect::to(next).into_response();
    }

    AuthTemplate {
        layout: Layout::load(&session, None).await,
        next: next.to_owned(),
        min_password_length: MIN_PASSWORD_LENGTH,
    }
    .into_response()
}

/// Handle the sign-in form.
///
/// # Errors
///
/// Returns an error only if the session store fails.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn sign_in<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Result<Redirect> {
    let next = safe_next(form.next.as_deref());
    let auth = AuthService::new(state.backend(), &session);

    match auth.sign_in(&form.email, &form.password).await {
        Ok(user) => {
            push_notice(
                &session,
                Notice::success("Welcome back!", format!("Signed in as {}", user.email)),
            )
            .await;
            Ok(Redirect::to(next))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in failed");
            push_notice(&session, failure_notice("Sign in failed", e)?).await;
            Ok(Redirect::to(&auth_page_url(next)))
        }
    }
}

/// Handle the sign-up form.
///
/// # Errors
///
/// Returns an error only if the session store fails.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn sign_up<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Result<Redirect> {
    let next = safe_next(form.next.as_deref());
    let redirect_to = format!("{}/", state.config().base_url.trim_end_matches('/'));
    let auth = AuthService::new(state.backend(), &session);

    match auth
        .sign_up(
            &form.email,
            &form.password,
            form.full_name.as_deref(),
            &redirect_to,
        )
        .await
    {
        Ok(SignUpResult::SignedIn(_)) => {
            push_notice(
                &session,
                Notice::success("Account created", "Welcome to PyroWarden!"),
            )
            .await;
            Ok(Redirect::to(next))
        }
        Ok(SignUpResult::ConfirmationRequired { email }) => {
            push_notice(
                &session,
                Notice::info(
                    "Check your email",
                    format!("We sent a confirmation link to {email}"),
                ),
            )
            .await;
            Ok(Redirect::to(&auth_page_url(next)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            push_notice(&session, failure_notice("Sign up failed", e)?).await;
            Ok(Redirect::to(&auth_page_url(next)))
        }
    }
}

/// Sign out and return home.
///
/// # Errors
///
/// Returns an error only if the session store fails.
#[instrument(skip_all)]
pub async fn sign_out<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
) -> Result<Redirect> {
    AuthService::new(state.backend(), &session).sign_out().await?;
    push_notice(
        &session,
        Notice::success("Signed out", "You have been signed out"),
    )
    .await;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_page_url_keeps_next() {
        assert_eq!(auth_page_url("/"), "/auth");
        assert_eq!(auth_page_url("/cart"), "/auth?next=%2Fcart");
    }
}
