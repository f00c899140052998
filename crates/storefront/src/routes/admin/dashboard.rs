//! Admin dashboard handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Notice;
use crate::routes::Layout;
use crate::services::admin::dashboard::{self, AdminStats};
use crate::state::AppState;
use crate::supabase::Backend;

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub layout: Layout,
    pub stats: Option<AdminStats>,
}

/// Display headline totals.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
) -> AdminDashboardTemplate {
    let mut layout = Layout::load(&session, Some(&admin)).await;
    let stats = match dashboard::load_stats(state.backend(), &admin.access_token()).await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load admin stats");
            layout.push(Notice::error("Error", "Failed to load dashboard stats"));
            None
        }
    };

    AdminDashboardTemplate { layout, stats }
}
