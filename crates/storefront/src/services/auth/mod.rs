//! Authentication service.
//!
//! Wraps the backend's password auth and keeps the signed-in user in the
//! visitor's session. Every session change (sign-in, token refresh,
//! sign-out) goes through [`AuthService::on_auth_state_change`], which is
//! also the only place the admin flag is resolved.

mod error;

pub use error::AuthError;

use chrono::Utc;
use pyrowarden_core::{AppRole, Email, UserId};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::supabase::{
    AccessToken, AuthBackend, AuthSession, RoleBackend, SignUpOutcome, SignUpRequest,
};

/// Minimum password length accepted by the sign-up form.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A change to the visitor's authentication state.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// Fresh credentials from sign-in or sign-up.
    SignedIn(AuthSession),
    /// New tokens from the refresh grant.
    TokenRefreshed(AuthSession),
    /// The session ended.
    SignedOut,
}

/// What a request knows about its visitor.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<CurrentUser>,
    pub is_admin: bool,
}

impl AuthState {
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpResult {
    /// The account is live and the visitor is signed in.
    SignedIn(CurrentUser),
    /// A confirmation email was sent to this address.
    ConfirmationRequired { email: String },
}

/// Authentication operations for one request.
pub struct AuthService<'a, B> {
    backend: &'a B,
    session: &'a Session,
}

impl<'a, B: AuthBackend + RoleBackend> AuthService<'a, B> {
    #[must_use]
    pub const fn new(backend: &'a B, session: &'a Session) -> Self {
        Self { backend, session }
    }

    /// Load the visitor from the session, refreshing expired tokens.
    ///
    /// A session that cannot be read or refreshed yields a signed-out state.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> AuthState {
        let stored = match self
            .session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read user from session");
                None
            }
        };

        let Some(user) = stored else {
            return AuthState::default();
        };

        if !user.is_expired(Utc::now()) {
            return AuthState {
                is_admin: user.is_admin,
                user: Some(user),
            };
        }

        let event = match self
            .backend
            .refresh_session(&user.tokens.refresh_token)
            .await
        {
            Ok(session) => AuthEvent::TokenRefreshed(session),
            Err(e) => {
                tracing::info!(user_id = %user.id, error = %e, "Session refresh failed");
                AuthEvent::SignedOut
            }
        };

        match self.on_auth_state_change(event).await {
            Ok(user) => AuthState {
                is_admin: user.as_ref().is_some_and(|u| u.is_admin),
                user,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store refreshed session");
                AuthState::default()
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for a wrong password or unknown email,
    /// `EmailNotConfirmed` for an unconfirmed account.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.backend.sign_in_with_password(&email, password).await?;
        let user = self
            .on_auth_state_change(AuthEvent::SignedIn(session))
            .await?;
        user.ok_or(AuthError::InvalidCredentials)
    }

    /// Register a new account.
    ///
    /// `redirect_to` is where the confirmation link lands.
    ///
    /// # Errors
    ///
    /// Returns `UserAlreadyExists` if the email is taken and `WeakPassword`
    /// if the password is rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        redirect_to: &str,
    ) -> Result<SignUpResult, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let request = SignUpRequest {
            email: email.as_str().to_owned(),
            password: password.to_owned(),
            full_name: full_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
            redirect_to: Some(redirect_to.to_owned()),
        };

        match self.backend.sign_up(&request).await? {
            SignUpOutcome::SignedIn(session) => {
                let user = self
                    .on_auth_state_change(AuthEvent::SignedIn(session))
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                Ok(SignUpResult::SignedIn(user))
            }
            SignUpOutcome::ConfirmationRequired(user) => Ok(SignUpResult::ConfirmationRequired {
                email: user.email.unwrap_or_else(|| email.as_str().to_owned()),
            }),
        }
    }

    /// End the visitor's session.
    ///
    /// A backend failure is logged; the local session is cleared regardless.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session store fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let stored = self
            .session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to read user from session");
                None
            });

        if let Some(user) = stored
            && let Err(e) = self.backend.sign_out(&user.access_token()).await
        {
            tracing::warn!(user_id = %user.id, error = %e, "Backend sign-out failed");
        }

        self.on_auth_state_change(AuthEvent::SignedOut).await?;
        Ok(())
    }

    /// Apply an auth event to the session and return the resulting user.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn on_auth_state_change(
        &self,
        event: AuthEvent,
    ) -> Result<Option<CurrentUser>, AuthError> {
        match event {
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session)
                if session.access_token.is_empty() =>
            {
                tracing::warn!(user_id = %session.user.id, "Auth event without access token");
                self.clear().await?;
                Ok(None)
            }
            AuthEvent::SignedIn(session) => {
                let user = self.store(&session).await?;
                // New identity, new session ID.
                self.session.cycle_id().await?;
                set_sentry_user(&user.id, Some(&user.email));
                tracing::info!(user_id = %user.id, is_admin = user.is_admin, "Signed in");
                Ok(Some(user))
            }
            AuthEvent::TokenRefreshed(session) => {
                let user = self.store(&session).await?;
                tracing::debug!(user_id = %user.id, "Session refreshed");
                Ok(Some(user))
            }
            AuthEvent::SignedOut => {
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Whether `user_id` holds the admin role.
    ///
    /// A failed check counts as "not admin".
    pub async fn check_admin_status(&self, caller: &AccessToken, user_id: UserId) -> bool {
        match self
            .backend
            .has_role(caller, user_id, AppRole::Admin)
            .await
        {
            Ok(is_admin) => is_admin,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Admin role check failed");
                false
            }
        }
    }

    async fn store(&self, session: &AuthSession) -> Result<CurrentUser, AuthError> {
        let is_admin = self
            .check_admin_status(&session.access_token(), session.user.id)
            .await;
        let user = CurrentUser::from_session(session, is_admin, Utc::now());
        self.session
            .insert(session_keys::CURRENT_USER, &user)
            .await?;
        Ok(user)
    }

    async fn clear(&self) -> Result<(), AuthError> {
        let removed = self
            .session
            .remove_value(session_keys::CURRENT_USER)
            .await?;
        if removed.is_some() {
            self.session.cycle_id().await?;
        }
        clear_sentry_user();
        Ok(())
    }
}

/// Check a sign-up password before sending it to the backend.
///
/// # Errors
///
/// Returns `WeakPassword` if the password is shorter than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
