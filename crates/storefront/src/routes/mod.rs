//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page
//! GET  /about, /careers               - Static pages
//! GET  /health, /health/ready         - Liveness and readiness
//!
//! # Catalog
//! GET  /products                      - Active products, newest first
//! GET  /product/{id}                  - Product detail
//!
//! # Cart & wishlist (sign-in required to mutate)
//! GET  /cart                          - Cart page
//! POST /cart/add | update | remove | clear
//! GET  /wishlist                      - Wishlist page
//! POST /wishlist/add | remove | toggle
//!
//! # Internships
//! GET  /internships                   - Open postings
//! GET  /internship/{id}/apply         - Application form (pre-filled if applied)
//! POST /internship/{id}/apply         - Submit or update
//!
//! # Account (requires auth)
//! GET  /dashboard                     - Stats and recent orders
//! GET  /profile, POST /profile        - Own profile
//!
//! # Auth
//! GET  /auth                          - Sign-in / sign-up page
//! POST /auth/sign-in | sign-up | sign-out
//!
//! # Admin (requires admin role)
//! GET  /admin                         - Totals
//! /admin/users, /admin/products, /admin/orders, /admin/internships
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod internships;
pub mod pages;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::{auth_rate_limiter, form_rate_limiter, take_notices};
use crate::models::{CurrentUser, Notice};
use crate::state::AppState;
use crate::supabase::{Backend, CatalogBackend, ProductQuery};

// =============================================================================
// Shared view data
// =============================================================================

/// Header and notice data every page renders.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Display name of the signed-in visitor.
    pub user_name: Option<String>,
    pub is_admin: bool,
    /// Flash notices to show once.
    pub notices: Vec<Notice>,
}

impl Layout {
    /// Build the layout for `user`, draining queued notices from the session.
    pub async fn load(session: &Session, user: Option<&CurrentUser>) -> Self {
        Self {
            user_name: user.map(|u| u.display_name().to_owned()),
            is_admin: user.is_some_and(|u| u.is_admin),
            notices: take_notices(session).await,
        }
    }

    /// Add a notice raised while rendering this page.
    pub fn push(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user_name.is_some()
    }
}

/// One `<option>` in a select box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    /// Options from `(value, label)` pairs, marking `current` as selected.
    pub fn list<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
        current: &str,
    ) -> Vec<Self> {
        pairs
            .into_iter()
            .map(|(value, label)| Self {
                value: value.to_owned(),
                label: label.to_owned(),
                selected: value == current,
            })
            .collect()
    }

    /// `All` followed by `pairs`; blank `current` selects `All`.
    pub fn with_all<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
        current: &str,
    ) -> Vec<Self> {
        let current = if current.trim().is_empty() { "all" } else { current };
        Self::list(std::iter::once(("all", "All")).chain(pairs), current)
    }
}

// =============================================================================
// Routers
// =============================================================================

fn catalog_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/", get(pages::home::<B>))
        .route("/about", get(pages::about))
        .route("/careers", get(pages::careers))
        .route("/products", get(products::index::<B>))
        .route("/product/{id}", get(products::show::<B>))
        .route("/internships", get(internships::index::<B>))
        .route("/internship/{id}/apply", get(internships::apply_page::<B>))
        .route("/cart", get(cart::show::<B>))
        .route("/wishlist", get(wishlist::show::<B>))
        .route("/dashboard", get(account::dashboard::<B>))
        .route("/profile", get(account::profile::<B>))
        .route("/auth", get(auth::page))
}

fn form_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/internship/{id}/apply", post(internships::apply::<B>))
        .route("/cart/add", post(cart::add::<B>))
        .route("/cart/update", post(cart::update::<B>))
        .route("/cart/remove", post(cart::remove::<B>))
        .route("/cart/clear", post(cart::clear::<B>))
        .route("/wishlist/add", post(wishlist::add::<B>))
        .route("/wishlist/remove", post(wishlist::remove::<B>))
        .route("/wishlist/toggle", post(wishlist::toggle::<B>))
        .route("/profile", post(account::update_profile::<B>))
        .route("/auth/sign-out", post(auth::sign_out::<B>))
        .layer(form_rate_limiter())
}

fn auth_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/auth/sign-in", post(auth::sign_in::<B>))
        .route("/auth/sign-up", post(auth::sign_up::<B>))
        .layer(auth_rate_limiter())
}

/// Create all routes for the site, including the 404 fallback.
pub fn routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<B>))
        .merge(catalog_routes())
        .merge(form_routes())
        .merge(auth_routes())
        .nest("/admin", admin::routes())
        .fallback(pages::not_found)
}

// =============================================================================
// Health
// =============================================================================

/// Liveness: the process is up.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness: the backend answers a one-row catalog read.
pub async fn readiness<B: Backend>(State(state): State<AppState<B>>) -> StatusCode {
    let query = ProductQuery {
        limit: Some(1),
        ..ProductQuery::storefront()
    };
    match state.backend().list_products(None, query).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_option_with_all() {
        let options = SelectOption::with_all([("admin", "Admin"), ("user", "User")], "");
        assert_eq!(options.len(), 3);
        assert!(options[0].selected);
        assert!(!options[1].selected);

        let options = SelectOption::with_all([("admin", "Admin")], "admin");
        assert!(!options[0].selected);
        assert!(options[1].selected);
    }
}
