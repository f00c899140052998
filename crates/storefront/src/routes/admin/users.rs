//! Admin user management handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use pyrowarden_core::UserId;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{RequireAdmin, push_notice};
use crate::models::Notice;
use crate::routes::{Layout, SelectOption};
use crate::services::admin::users::{self, UserCounts, UserFilter, UserForm, UserRow};
use crate::state::AppState;
use crate::supabase::Backend;

const ROLE_CHOICES: [(&str, &str); 2] = [("admin", "Admin"), ("user", "User")];

/// Users list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users/index.html")]
pub struct UsersTemplate {
    pub layout: Layout,
    pub rows: Vec<UserRow>,
    pub counts: UserCounts,
    pub q: String,
    pub role_options: Vec<SelectOption>,
}

/// User edit template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users/edit.html")]
pub struct UserEditTemplate {
    pub layout: Layout,
    pub row: UserRow,
    pub form: UserForm,
    pub role_options: Vec<SelectOption>,
}

/// List users with roles, filtered by the query string.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Query(filter): Query<UserFilter>,
) -> UsersTemplate {
    let mut layout = Layout::load(&session, Some(&admin)).await;
    let all = users::list_users(state.backend(), &admin.access_token())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load users");
            layout.push(Notice::error("Error", "Failed to load users"));
            Vec::new()
        });

    UsersTemplate {
        layout,
        counts: UserCounts::of(&all),
        rows: filter.apply(&all).into_iter().cloned().collect(),
        role_options: SelectOption::with_all(ROLE_CHOICES, filter.role().as_str()),
        q: filter.q,
    }
}

async fn load_row<B: Backend>(
    state: &AppState<B>,
    admin: &crate::models::CurrentUser,
    session: &Session,
    id: UserId,
) -> Option<UserRow> {
    match users::find_user(state.backend(), &admin.access_token(), id).await {
        Ok(Some(row)) => Some(row),
        Ok(None) => {
            push_notice(session, Notice::error("Error", "User not found")).await;
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load user");
            push_notice(session, Notice::error("Error", "Failed to load user")).await;
            None
        }
    }
}

/// Display the edit form for one user.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn edit<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<UserId>,
) -> Response {
    let Some(row) = load_row(&state, &admin, &session, id).await else {
        return Redirect::to("/admin/users").into_response();
    };

    let form = UserForm::from_row(&row);
    UserEditTemplate {
        layout: Layout::load(&session, Some(&admin)).await,
        role_options: SelectOption::list(ROLE_CHOICES, &form.role),
        row,
        form,
    }
    .into_response()
}

/// Save profile fields and the admin role.
#[instrument(skip(state, admin, session, form), fields(admin_id = %admin.id))]
pub async fn update<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<UserId>,
    Form(form): Form<UserForm>,
) -> Redirect {
    let notice = users::save_user(state.backend(), &admin.access_token(), id, &form).await;
    push_notice(&session, notice).await;
    Redirect::to("/admin/users")
}
