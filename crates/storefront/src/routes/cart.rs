//! Cart route handlers.
//!
//! Every mutation is a form post that queues a notice and redirects, so the
//! next page render re-reads the cart from the backend. The posts themselves
//! therefore skip the store's own re-read.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use pyrowarden_core::{CartItemId, Price, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::filters;
use crate::middleware::{OptionalAuth, push_notice, safe_next};
use crate::models::Notice;
use crate::services::cart::CartStore;
use crate::services::forms;
use crate::state::AppState;
use crate::supabase::{Backend, CartItem};

// =============================================================================
// Form Types
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: String,
    /// Page to return to.
    pub next: Option<String>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: CartItemId,
    pub quantity: String,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: CartItemId,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub items: Vec<CartItem>,
    pub total_items: i32,
    pub total_price: Price,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart.
#[instrument(skip_all)]
pub async fn show<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> CartShowTemplate {
    let mut layout = Layout::load(&session, user.as_ref()).await;
    let mut cart = CartStore::new(state.backend(), user.as_ref());
    if let Err(e) = cart.fetch_cart().await {
        tracing::error!(error = %e, "Failed to fetch cart");
        layout.push(Notice::error("Error", "Failed to load cart"));
    }

    CartShowTemplate {
        layout,
        total_items: cart.total_items(),
        total_price: cart.total_price(),
        items: cart.into_items(),
    }
}

/// Add a product to the cart, overwriting the quantity of an existing line.
#[instrument(skip(state, user, session))]
pub async fn add<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> impl IntoResponse {
    let notice = match forms::integer_or(&form.quantity, 1, "Quantity") {
        Ok(quantity) if quantity > 0 => {
            CartStore::new(state.backend(), user.as_ref())
                .without_refetch()
                .add_to_cart(form.product_id, quantity)
                .await
        }
        Ok(_) => Notice::error("Error", "Quantity must be at least 1"),
        Err(e) => Notice::error("Error", e.to_string()),
    };
    push_notice(&session, notice).await;
    Redirect::to(safe_next(form.next.as_deref().or(Some("/cart"))))
}

/// Set a line's quantity. Zero removes the line; a blank field is refused.
#[instrument(skip(state, user, session))]
pub async fn update<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> impl IntoResponse {
    let notice = match forms::integer(&form.quantity, "Quantity") {
        Ok(quantity) => {
            CartStore::new(state.backend(), user.as_ref())
                .without_refetch()
                .update_quantity(form.item_id, quantity)
                .await
        }
        Err(e) => Some(Notice::error("Error", e.to_string())),
    };
    if let Some(notice) = notice {
        push_notice(&session, notice).await;
    }
    Redirect::to("/cart")
}

/// Remove one line.
#[instrument(skip(state, user, session))]
pub async fn remove<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> impl IntoResponse {
    let notice = CartStore::new(state.backend(), user.as_ref())
        .without_refetch()
        .remove_from_cart(form.item_id)
        .await;
    push_notice(&session, notice).await;
    Redirect::to("/cart")
}

/// Empty the cart.
#[instrument(skip_all)]
pub async fn clear<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> impl IntoResponse {
    if let Some(notice) = CartStore::new(state.backend(), user.as_ref())
        .without_refetch()
        .clear_cart()
        .await
    {
        push_notice(&session, notice).await;
    }
    Redirect::to("/cart")
}
