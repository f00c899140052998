//! Backend client for the hosted Supabase project.
//!
//! # Architecture
//!
//! - The backend is the source of truth: no local sync, no cache. Every page
//!   reads straight from PostgREST and every mutation is followed by a re-read.
//! - Authorization is the backend's job (row level security). Each request is
//!   sent with the caller's access token so RLS sees who is asking; requests
//!   without a caller fall back to the public anon key.
//! - Each concern is a trait in [`backend`] so services can run against
//!   [`SupabaseClient`] in production and `MemoryBackend` in tests (behind
//!   the `test-support` feature).
//!
//! # APIs
//!
//! ## Auth (`/auth/v1`)
//! - Password sign-in, sign-up, sign-out, current user, refresh-token grant
//!
//! ## REST (`/rest/v1`)
//! - `profiles`, `user_roles`, `products`, `cart_items`, `wishlist_items`,
//!   `orders`, `order_items`, `internships`, `internship_applications`
//! - RPC: `has_role`, `get_user_roles`, `assign_admin_by_email`
//!
//! # Example
//!
//! ```rust,ignore
//! use pyrowarden_storefront::supabase::{CartBackend, SupabaseClient};
//!
//! let client = SupabaseClient::new(&config.supabase)?;
//! let session = client.sign_in_with_password(&email, &password).await?;
//! let items = client
//!     .list_cart_items(&session.access_token(), session.user.id)
//!     .await?;
//! ```

pub mod backend;
mod client;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
mod query;
mod tables;
pub mod types;

pub use backend::{
    AuthBackend, Backend, CartBackend, CatalogBackend, InternshipBackend, OrderBackend,
    ProfileBackend, RoleBackend, WishlistBackend,
};
pub use client::SupabaseClient;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryBackend;
pub use types::*;

use thiserror::Error;

/// Postgres error code for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Postgres error code raised when row level security rejects a write.
pub const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// PostgREST error code for an expired or invalid JWT.
pub const JWT_INVALID: &str = "PGRST301";

/// Result alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error body.
    #[error("Backend error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Postgres SQLSTATE, PostgREST code, or GoTrue error code.
        code: Option<String>,
        /// Human readable message from the backend.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// Build an API error.
    pub fn api(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.map(str::to_owned),
            message: message.into(),
        }
    }

    /// The backend error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of an API error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a duplicate key insert (Postgres `23505`).
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(UNIQUE_VIOLATION)
    }

    /// True when RLS or the auth layer refused the request.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        self.code() == Some(INSUFFICIENT_PRIVILEGE) || matches!(self.status(), Some(401 | 403))
    }

    /// True when the caller's token is missing, invalid or expired.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.code() == Some(JWT_INVALID) || self.status() == Some(401)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detected_by_code() {
        let err = BackendError::api(409, Some(UNIQUE_VIOLATION), "duplicate key value");
        assert!(err.is_unique_violation());
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn test_permission_denied_by_code_or_status() {
        assert!(BackendError::api(403, Some(INSUFFICIENT_PRIVILEGE), "rls").is_permission_denied());
        assert!(BackendError::api(401, None, "no token").is_permission_denied());
        assert!(!BackendError::api(400, Some("22P02"), "bad uuid").is_permission_denied());
    }

    #[test]
    fn test_unauthorized() {
        assert!(BackendError::api(401, Some(JWT_INVALID), "JWT expired").is_unauthorized());
        assert!(!BackendError::NotFound("product".to_string()).is_unauthorized());
    }

    #[test]
    fn test_error_display() {
        let err = BackendError::api(500, None, "boom");
        assert_eq!(err.to_string(), "Backend error (500): boom");

        let err = BackendError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }
}
