//! Session-related types.
//!
//! Types stored in the session for authentication state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use pyrowarden_core::UserId;

use crate::supabase::{AccessToken, AuthSession};

/// Seconds before expiry at which an access token is treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Backend tokens of the signed-in visitor.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session-stored user identity.
///
/// `is_admin` is resolved with `has_role` whenever the session changes
/// (sign-in, token refresh) and is not re-checked in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth user ID.
    pub id: UserId,
    /// Email address.
    pub email: String,
    /// Full name from sign-up metadata.
    pub full_name: Option<String>,
    /// Whether the user held the admin role at the last session change.
    pub is_admin: bool,
    pub tokens: SessionTokens,
}

impl CurrentUser {
    /// Build from a fresh backend session.
    #[must_use]
    pub fn from_session(session: &AuthSession, is_admin: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: session.user.id,
            email: session.user.email.clone().unwrap_or_default(),
            full_name: session.user.user_metadata.full_name.clone(),
            is_admin,
            tokens: SessionTokens {
                access_token: session.access_token.clone(),
                refresh_token: session.refresh_token.clone(),
                expires_at: now + Duration::seconds(session.expires_in),
            },
        }
    }

    /// The access token as a request credential.
    #[must_use]
    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(self.tokens.access_token.clone())
    }

    /// Whether the access token is expired or about to expire.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_BUFFER_SECS) >= self.tokens.expires_at
    }

    /// Name for the navigation bar.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for flash notices waiting to be shown.
    pub const NOTICES: &str = "notices";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::supabase::{AuthUser, UserMetadata};

    fn session(expires_in: i64) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in,
            user: AuthUser {
                id: UserId::random(),
                email: Some("ada@example.com".to_string()),
                user_metadata: UserMetadata { full_name: None },
            },
        }
    }

    #[test]
    fn test_expiry_uses_buffer() {
        let now = Utc::now();
        let user = CurrentUser::from_session(&session(3600), false, now);
        assert!(!user.is_expired(now));
        assert!(user.is_expired(now + Duration::seconds(3541)));

        let short = CurrentUser::from_session(&session(30), false, now);
        assert!(short.is_expired(now));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = CurrentUser::from_session(&session(3600), false, Utc::now());
        assert_eq!(user.display_name(), "ada@example.com");
    }

    #[test]
    fn test_tokens_debug_redacted() {
        let user = CurrentUser::from_session(&session(3600), true, Utc::now());
        let debug = format!("{user:?}");
        assert!(!debug.contains("\"access\""));
        assert!(debug.contains("[REDACTED]"));
    }
}
