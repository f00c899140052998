//! Catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use pyrowarden_core::ProductId;
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::filters;
use crate::middleware::{OptionalAuth, push_notice};
use crate::models::{CurrentUser, Notice};
use crate::services::wishlist::WishlistStore;
use crate::state::AppState;
use crate::supabase::{Backend, CatalogBackend, Product, ProductQuery};

/// A product with the visitor's wishlist membership.
pub struct ProductCard {
    pub product: Product,
    pub wishlisted: bool,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub cards: Vec<ProductCard>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub card: ProductCard,
}

/// Fetch the visitor's wishlist for membership checks. Failures leave it empty.
async fn load_wishlist<'a, B: Backend>(
    backend: &'a B,
    user: Option<&'a CurrentUser>,
) -> WishlistStore<'a, B> {
    let mut wishlist = WishlistStore::new(backend, user);
    if let Err(e) = wishlist.fetch_wishlist().await {
        tracing::warn!(error = %e, "Failed to load wishlist");
    }
    wishlist
}

/// Display active products, newest first.
#[instrument(skip_all)]
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> ProductsIndexTemplate {
    let mut layout = Layout::load(&session, user.as_ref()).await;
    let token = user.as_ref().map(CurrentUser::access_token);

    let (products, wishlist) = futures::join!(
        state
            .backend()
            .list_products(token.as_ref(), ProductQuery::storefront()),
        load_wishlist(state.backend(), user.as_ref()),
    );

    let products = products.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load products");
        layout.push(Notice::error("Error", "Failed to load products"));
        Vec::new()
    });

    let cards = products
        .into_iter()
        .map(|product| ProductCard {
            wishlisted: wishlist.is_in_wishlist(product.id),
            product,
        })
        .collect();

    ProductsIndexTemplate { layout, cards }
}

/// Display one active product.
///
/// Unknown, inactive or malformed IDs go back to `/products` with a notice.
#[instrument(skip(state, user, session))]
pub async fn show<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let token = user.as_ref().map(CurrentUser::access_token);

    let product = match id.parse::<ProductId>() {
        Ok(id) => state
            .backend()
            .get_product(token.as_ref(), id, true)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to load product");
                None
            }),
        Err(_) => None,
    };

    let Some(product) = product else {
        push_notice(
            &session,
            Notice::error("Product not found", "That product is no longer available"),
        )
        .await;
        return Redirect::to("/products").into_response();
    };

    let wishlist = load_wishlist(state.backend(), user.as_ref()).await;
    ProductShowTemplate {
        layout: Layout::load(&session, user.as_ref()).await,
        card: ProductCard {
            wishlisted: wishlist.is_in_wishlist(product.id),
            product,
        },
    }
    .into_response()
}
