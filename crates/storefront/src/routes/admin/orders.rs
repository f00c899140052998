//! Admin order handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use pyrowarden_core::{OrderId, OrderStatus};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{RequireAdmin, push_notice};
use crate::models::Notice;
use crate::routes::{Layout, SelectOption};
use crate::services::admin::orders::{self, OrderDetail, OrderFilter, OrderStats};
use crate::state::AppState;
use crate::supabase::{Backend, OrderBackend, OrderWithCustomer};

/// Status update form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Orders list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders/index.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderWithCustomer>,
    pub stats: OrderStats,
    pub q: String,
    pub status_options: Vec<SelectOption>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub detail: OrderDetail,
    /// Statuses the dropdown offers: the current one and those reachable from it.
    pub status_options: Vec<SelectOption>,
}

/// List every order with stats, filtered by the query string.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Query(filter): Query<OrderFilter>,
) -> OrdersTemplate {
    let mut layout = Layout::load(&session, Some(&admin)).await;
    let all = state
        .backend()
        .list_orders(&admin.access_token())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load orders");
            layout.push(Notice::error("Error", "Failed to load orders"));
            Vec::new()
        });

    OrdersTemplate {
        layout,
        stats: OrderStats::of(&all),
        orders: filter.apply(&all).into_iter().cloned().collect(),
        status_options: SelectOption::with_all(
            OrderStatus::ALL.iter().map(|s| (s.as_str(), s.label())),
            &filter.status,
        ),
        q: filter.q,
    }
}

/// Display one order with its lines.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn show<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<OrderId>,
) -> Response {
    let detail = match orders::load_detail(state.backend(), &admin.access_token(), id).await {
        Ok(Some(detail)) => detail,
        Ok(None) => {
            push_notice(&session, Notice::error("Error", "Order not found")).await;
            return Redirect::to("/admin/orders").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load order");
            push_notice(&session, Notice::error("Error", "Failed to load order details")).await;
            return Redirect::to("/admin/orders").into_response();
        }
    };

    let current = detail.order.order.status;
    OrderShowTemplate {
        layout: Layout::load(&session, Some(&admin)).await,
        status_options: SelectOption::list(
            current.reachable().into_iter().map(|s| (s.as_str(), s.label())),
            current.as_str(),
        ),
        detail,
    }
    .into_response()
}

/// Set an order's status.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn update_status<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let notice = match form.status.trim().parse::<OrderStatus>() {
        Ok(status) => orders::update_status(state.backend(), &admin.access_token(), id, status).await,
        Err(e) => Notice::error("Error", e.to_string()),
    };
    push_notice(&session, notice).await;
    Redirect::to(&format!("/admin/orders/{id}"))
}
