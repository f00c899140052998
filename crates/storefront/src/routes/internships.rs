//! Internship listing and application handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use pyrowarden_core::InternshipId;
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth, push_notice};
use crate::models::{CurrentUser, Notice};
use crate::services::applications::{self, ApplicationForm, ApplyError};
use crate::state::AppState;
use crate::supabase::{Backend, Internship};

/// Internship listing template.
#[derive(Template, WebTemplate)]
#[template(path = "internships/index.html")]
pub struct InternshipsTemplate {
    pub layout: Layout,
    pub internships: Vec<Internship>,
}

/// Application form template.
#[derive(Template, WebTemplate)]
#[template(path = "internships/apply.html")]
pub struct ApplyTemplate {
    pub layout: Layout,
    pub internship: Internship,
    /// The visitor already applied; the form updates that application.
    pub has_applied: bool,
    pub form: ApplicationForm,
}

/// Display open internships.
#[instrument(skip_all)]
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> InternshipsTemplate {
    let mut layout = Layout::load(&session, user.as_ref()).await;
    let internships = applications::list_open(state.backend())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load internships");
            layout.push(Notice::error("Error", "Failed to load internships"));
            Vec::new()
        });

    InternshipsTemplate {
        layout,
        internships,
    }
}

/// Display the application form, pre-filled from an earlier application.
#[instrument(skip(state, user, session))]
pub async fn apply_page<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<InternshipId>,
) -> Response {
    render_apply(&state, &user, &session, id, None).await
}

/// Submit a new application or update the existing one.
#[instrument(skip(state, user, session, form))]
pub async fn apply<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<InternshipId>,
    Form(form): Form<ApplicationForm>,
) -> Response {
    match applications::submit(state.backend(), &user, id, &form).await {
        Ok(submission) => {
            push_notice(&session, submission.notice()).await;
            Redirect::to(&format!("/internship/{id}/apply")).into_response()
        }
        Err(e) => {
            if let ApplyError::Backend(err) = &e {
                tracing::error!(error = %err, "Failed to submit application");
            }
            push_notice(&session, e.notice()).await;
            render_apply(&state, &user, &session, id, Some(form)).await
        }
    }
}

/// Render the form, keeping `posted` values when re-showing a failed submit.
async fn render_apply<B: Backend>(
    state: &AppState<B>,
    user: &CurrentUser,
    session: &Session,
    id: InternshipId,
    posted: Option<ApplicationForm>,
) -> Response {
    let page = match applications::load_apply_page(state.backend(), id, Some(user)).await {
        Ok(page) => page,
        Err(e) => {
            if let ApplyError::Backend(err) = &e {
                tracing::error!(error = %err, "Failed to fetch internship");
            }
            push_notice(session, ApplyError::NotFound.notice()).await;
            return Redirect::to("/internships").into_response();
        }
    };

    let form = posted.unwrap_or_else(|| {
        page.existing
            .as_ref()
            .map(|application| ApplicationForm::from_details(&application.details))
            .unwrap_or_default()
    });

    ApplyTemplate {
        layout: Layout::load(session, Some(user)).await,
        has_applied: page.existing.is_some(),
        internship: page.internship,
        form,
    }
    .into_response()
}
