//! Customer dashboard and profile handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::filters;
use crate::middleware::{RequireAuth, push_notice};
use crate::models::Notice;
use crate::services::account::{self, Dashboard, ProfileForm};
use crate::state::AppState;
use crate::supabase::Backend;

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub email: String,
    pub dashboard: Option<Dashboard>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub email: String,
    pub form: ProfileForm,
}

/// Display the customer dashboard.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn dashboard<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> DashboardTemplate {
    let mut layout = Layout::load(&session, Some(&user)).await;
    let dashboard = match account::load_dashboard(state.backend(), &user).await {
        Ok(dashboard) => Some(dashboard),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load dashboard");
            layout.push(Notice::error("Error", "Failed to load dashboard data"));
            None
        }
    };

    DashboardTemplate {
        layout,
        email: user.email,
        dashboard,
    }
}

/// Display the profile form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> ProfileTemplate {
    let mut layout = Layout::load(&session, Some(&user)).await;
    let form = match account::load_profile(state.backend(), &user).await {
        Ok(Some(profile)) => ProfileForm {
            full_name: profile.full_name.unwrap_or_default(),
            phone: profile.phone.unwrap_or_default(),
        },
        Ok(None) => ProfileForm::default(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load profile");
            layout.push(Notice::error("Error", "Failed to load profile"));
            ProfileForm::default()
        }
    };

    ProfileTemplate {
        layout,
        email: user.email,
        form,
    }
}

/// Save the profile form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> impl IntoResponse {
    let notice = account::save_profile(state.backend(), &user, &form).await;
    push_notice(&session, notice).await;
    Redirect::to("/profile")
}
