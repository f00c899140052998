//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use pyrowarden_core::{ProductId, WishlistItemId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::filters;
use crate::middleware::{OptionalAuth, push_notice, safe_next};
use crate::models::Notice;
use crate::services::wishlist::WishlistStore;
use crate::state::AppState;
use crate::supabase::{Backend, WishlistItem};

/// Add or toggle form data.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub product_id: ProductId,
    /// Page to return to.
    pub next: Option<String>,
}

/// Remove form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub item_id: WishlistItemId,
}

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/show.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub items: Vec<WishlistItem>,
}

/// Display the wishlist.
#[instrument(skip_all)]
pub async fn show<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> WishlistTemplate {
    let mut layout = Layout::load(&session, user.as_ref()).await;
    let mut wishlist = WishlistStore::new(state.backend(), user.as_ref());
    if let Err(e) = wishlist.fetch_wishlist().await {
        tracing::error!(error = %e, "Failed to fetch wishlist");
        layout.push(Notice::error("Error", "Failed to load wishlist"));
    }

    WishlistTemplate {
        layout,
        items: wishlist.into_items(),
    }
}

/// Add a product to the wishlist.
#[instrument(skip(state, user, session))]
pub async fn add<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Form(form): Form<ProductForm>,
) -> impl IntoResponse {
    let notice = WishlistStore::new(state.backend(), user.as_ref())
        .without_refetch()
        .add_to_wishlist(form.product_id)
        .await;
    push_notice(&session, notice).await;
    Redirect::to(safe_next(form.next.as_deref().or(Some("/wishlist"))))
}

/// Remove a wishlist row.
#[instrument(skip(state, user, session))]
pub async fn remove<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Form(form): Form<RemoveForm>,
) -> impl IntoResponse {
    let notice = WishlistStore::new(state.backend(), user.as_ref())
        .without_refetch()
        .remove_from_wishlist(form.item_id)
        .await;
    push_notice(&session, notice).await;
    Redirect::to("/wishlist")
}

/// Heart button on product cards: remove if listed, add otherwise.
#[instrument(skip(state, user, session))]
pub async fn toggle<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Form(form): Form<ProductForm>,
) -> impl IntoResponse {
    // Membership needs one read; the page after the redirect reads again.
    let mut wishlist = WishlistStore::new(state.backend(), user.as_ref()).without_refetch();
    if let Err(e) = wishlist.fetch_wishlist().await {
        tracing::warn!(error = %e, "Failed to load wishlist before toggle");
    }
    let notice = wishlist.toggle(form.product_id).await;
    push_notice(&session, notice).await;
    Redirect::to(safe_next(form.next.as_deref().or(Some("/products"))))
}
