//! Admin back-office handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin) and
//! calls the backend with the admin's own token; row level security does the
//! rest. Mutations redirect back to the list page with a notice.

pub mod dashboard;
pub mod internships;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;
use crate::supabase::Backend;

/// Create the `/admin` router.
pub fn routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/", get(dashboard::index::<B>))
        .route("/users", get(users::index::<B>))
        .route("/users/{id}", get(users::edit::<B>).post(users::update::<B>))
        .route("/products", get(products::index::<B>))
        .route(
            "/products/new",
            get(products::new_form).post(products::create::<B>),
        )
        .route(
            "/products/{id}",
            get(products::edit::<B>).post(products::update::<B>),
        )
        .route("/products/{id}/delete", post(products::delete::<B>))
        .route("/orders", get(orders::index::<B>))
        .route("/orders/{id}", get(orders::show::<B>))
        .route("/orders/{id}/status", post(orders::update_status::<B>))
        .route("/internships", get(internships::index::<B>))
        .route(
            "/internships/new",
            get(internships::new_form).post(internships::create::<B>),
        )
        .route(
            "/internships/{id}",
            get(internships::edit::<B>).post(internships::update::<B>),
        )
        .route("/internships/{id}/delete", post(internships::delete::<B>))
        .route(
            "/applications/{id}/status",
            post(internships::application_status::<B>),
        )
        .route(
            "/applications/{id}/notes",
            post(internships::application_notes::<B>),
        )
}
