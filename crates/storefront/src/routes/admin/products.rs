//! Admin catalog handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use pyrowarden_core::{ProductId, ProductStatus};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{RequireAdmin, push_notice};
use crate::models::{CurrentUser, Notice};
use crate::routes::{Layout, SelectOption};
use crate::services::admin::products::{self, ProductFilter, ProductForm};
use crate::state::AppState;
use crate::supabase::{Backend, CatalogBackend, Product, ProductQuery};

fn status_options(current: &str) -> Vec<SelectOption> {
    SelectOption::list(
        ProductStatus::ALL.iter().map(|s| (s.as_str(), s.label())),
        current,
    )
}

/// Products list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/index.html")]
pub struct ProductsTemplate {
    pub layout: Layout,
    pub products: Vec<Product>,
    pub total: usize,
    pub q: String,
    pub status_options: Vec<SelectOption>,
    pub category_options: Vec<SelectOption>,
}

/// Product create/edit template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/form.html")]
pub struct ProductFormTemplate {
    pub layout: Layout,
    /// Set when editing an existing product.
    pub product_id: Option<ProductId>,
    pub form: ProductForm,
    pub status_options: Vec<SelectOption>,
}

impl ProductFormTemplate {
    async fn render(
        session: &Session,
        admin: &CurrentUser,
        product_id: Option<ProductId>,
        form: ProductForm,
        error: Option<Notice>,
    ) -> Self {
        let mut layout = Layout::load(session, Some(admin)).await;
        if let Some(notice) = error {
            layout.push(notice);
        }
        Self {
            layout,
            product_id,
            status_options: status_options(&form.status),
            form,
        }
    }

    /// Form action URL.
    #[must_use]
    pub fn action(&self) -> String {
        self.product_id.map_or_else(
            || "/admin/products/new".to_string(),
            |id| format!("/admin/products/{id}"),
        )
    }
}

/// List every product, filtered by the query string.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Query(filter): Query<ProductFilter>,
) -> ProductsTemplate {
    let mut layout = Layout::load(&session, Some(&admin)).await;
    let all = state
        .backend()
        .list_products(Some(&admin.access_token()), ProductQuery::all())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load products");
            layout.push(Notice::error("Error", "Failed to load products"));
            Vec::new()
        });

    let categories = products::categories(&all);
    ProductsTemplate {
        layout,
        total: all.len(),
        products: filter.apply(&all).into_iter().cloned().collect(),
        status_options: SelectOption::with_all(
            ProductStatus::ALL.iter().map(|s| (s.as_str(), s.label())),
            &filter.status,
        ),
        category_options: SelectOption::with_all(
            categories.iter().map(|c| (c.as_str(), c.as_str())),
            &filter.category,
        ),
        q: filter.q,
    }
}

/// Display an empty product form.
pub async fn new_form(
    RequireAdmin(admin): RequireAdmin,
    session: Session,
) -> ProductFormTemplate {
    ProductFormTemplate::render(&session, &admin, None, ProductForm::default(), None).await
}

/// Create a product from the posted form.
#[instrument(skip(state, admin, session, form), fields(admin_id = %admin.id))]
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Response {
    match form.parse() {
        Ok(input) => {
            let notice = products::create(state.backend(), &admin.access_token(), &input).await;
            push_notice(&session, notice).await;
            Redirect::to("/admin/products").into_response()
        }
        Err(e) => {
            let notice = Notice::error("Please check the form", e.to_string());
            ProductFormTemplate::render(&session, &admin, None, form, Some(notice))
                .await
                .into_response()
        }
    }
}

/// Display the edit form for one product.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn edit<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<ProductId>,
) -> Response {
    match state
        .backend()
        .get_product(Some(&admin.access_token()), id, false)
        .await
    {
        Ok(Some(product)) => {
            let form = ProductForm::from_product(&product);
            ProductFormTemplate::render(&session, &admin, Some(id), form, None)
                .await
                .into_response()
        }
        Ok(None) => {
            push_notice(&session, Notice::error("Error", "Product not found")).await;
            Redirect::to("/admin/products").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load product");
            push_notice(&session, Notice::error("Error", "Failed to load product")).await;
            Redirect::to("/admin/products").into_response()
        }
    }
}

/// Overwrite a product from the posted form.
#[instrument(skip(state, admin, session, form), fields(admin_id = %admin.id))]
pub async fn update<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Response {
    match form.parse() {
        Ok(input) => {
            let notice = products::update(state.backend(), &admin.access_token(), id, &input).await;
            push_notice(&session, notice).await;
            Redirect::to("/admin/products").into_response()
        }
        Err(e) => {
            let notice = Notice::error("Please check the form", e.to_string());
            ProductFormTemplate::render(&session, &admin, Some(id), form, Some(notice))
                .await
                .into_response()
        }
    }
}

/// Delete a product.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn delete<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<ProductId>,
) -> Redirect {
    let notice = products::delete(state.backend(), &admin.access_token(), id).await;
    push_notice(&session, notice).await;
    Redirect::to("/admin/products")
}
