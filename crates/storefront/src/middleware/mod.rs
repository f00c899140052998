//! HTTP middleware and extractors.
//!
//! - `auth` - `RequireAuth`, `RequireAdmin` and `OptionalAuth` extractors
//! - `notices` - Flash notices held in the session
//! - `rate_limit` - Per-IP limits on form posts
//! - `request_id` - `x-request-id` propagation
//! - `security_headers` - CSP and friends
//! - `session` - Cookie session layer

pub mod auth;
pub mod notices;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{AuthRejection, OptionalAuth, RequireAdmin, RequireAuth, safe_next};
pub use notices::{push_notice, take_notices};
pub use rate_limit::{auth_rate_limiter, form_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
