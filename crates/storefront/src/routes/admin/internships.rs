//! Admin internship and application review handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use pyrowarden_core::{ApplicationId, ApplicationStatus, InternshipId, InternshipStatus};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{RequireAdmin, push_notice};
use crate::models::{CurrentUser, Notice};
use crate::routes::{Layout, SelectOption};
use crate::services::admin::internships::{self, InternshipForm};
use crate::state::AppState;
use crate::supabase::{ApplicationWithContext, Backend, Internship, InternshipBackend};

const KIND_CHOICES: [(&str, &str); 3] =
    [("remote", "Remote"), ("onsite", "On-site"), ("hybrid", "Hybrid")];

/// Application status form data.
#[derive(Debug, Deserialize)]
pub struct ApplicationStatusForm {
    pub status: String,
}

/// Reviewer notes form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotesForm {
    pub admin_notes: String,
}

/// An application row with its status dropdown.
pub struct ApplicationRow {
    pub entry: ApplicationWithContext,
    /// Every status; reviewers may jump to any of them.
    pub status_options: Vec<SelectOption>,
}

impl From<ApplicationWithContext> for ApplicationRow {
    fn from(entry: ApplicationWithContext) -> Self {
        let status_options = SelectOption::list(
            ApplicationStatus::ALL.iter().map(|s| (s.as_str(), s.label())),
            entry.application.status.as_str(),
        );
        Self {
            entry,
            status_options,
        }
    }
}

/// Internships overview template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/internships/index.html")]
pub struct InternshipsTemplate {
    pub layout: Layout,
    pub internships: Vec<Internship>,
    pub applications: Vec<ApplicationRow>,
}

/// Internship create/edit template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/internships/form.html")]
pub struct InternshipFormTemplate {
    pub layout: Layout,
    /// Set when editing an existing posting.
    pub internship_id: Option<InternshipId>,
    pub form: InternshipForm,
    pub status_options: Vec<SelectOption>,
    pub kind_options: Vec<SelectOption>,
}

impl InternshipFormTemplate {
    async fn render(
        session: &Session,
        admin: &CurrentUser,
        internship_id: Option<InternshipId>,
        form: InternshipForm,
        error: Option<Notice>,
    ) -> Self {
        let mut layout = Layout::load(session, Some(admin)).await;
        if let Some(notice) = error {
            layout.push(notice);
        }
        Self {
            layout,
            internship_id,
            status_options: SelectOption::list(
                InternshipStatus::ALL.iter().map(|s| (s.as_str(), s.label())),
                &form.status,
            ),
            kind_options: SelectOption::list(KIND_CHOICES, &form.kind),
            form,
        }
    }

    /// Form action URL.
    #[must_use]
    pub fn action(&self) -> String {
        self.internship_id.map_or_else(
            || "/admin/internships/new".to_string(),
            |id| format!("/admin/internships/{id}"),
        )
    }
}

/// List postings and applications.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
) -> InternshipsTemplate {
    let mut layout = Layout::load(&session, Some(&admin)).await;
    let (internships, applications) =
        match internships::load_overview(state.backend(), &admin.access_token()).await {
            Ok(overview) => (overview.internships, overview.applications),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load internships");
                layout.push(Notice::error("Error", "Failed to load internships"));
                (Vec::new(), Vec::new())
            }
        };

    InternshipsTemplate {
        layout,
        internships,
        applications: applications.into_iter().map(ApplicationRow::from).collect(),
    }
}

/// Display an empty posting form.
pub async fn new_form(RequireAdmin(admin): RequireAdmin, session: Session) -> InternshipFormTemplate {
    InternshipFormTemplate::render(&session, &admin, None, InternshipForm::default(), None).await
}

/// Save the posted form as a new or existing posting.
async fn save<B: Backend>(
    state: &AppState<B>,
    admin: &CurrentUser,
    session: &Session,
    id: Option<InternshipId>,
    form: InternshipForm,
) -> Response {
    match form.parse() {
        Ok(input) => {
            let notice = internships::save(state.backend(), &admin.access_token(), id, &input).await;
            push_notice(session, notice).await;
            Redirect::to("/admin/internships").into_response()
        }
        Err(e) => {
            let notice = Notice::error("Please check the form", e.to_string());
            InternshipFormTemplate::render(session, admin, id, form, Some(notice))
                .await
                .into_response()
        }
    }
}

/// Create a posting.
#[instrument(skip(state, admin, session, form), fields(admin_id = %admin.id))]
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Form(form): Form<InternshipForm>,
) -> Response {
    save(&state, &admin, &session, None, form).await
}

/// Display the edit form for one posting.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn edit<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<InternshipId>,
) -> Response {
    match state
        .backend()
        .get_internship(Some(&admin.access_token()), id)
        .await
    {
        Ok(Some(internship)) => {
            let form = InternshipForm::from_internship(&internship);
            InternshipFormTemplate::render(&session, &admin, Some(id), form, None)
                .await
                .into_response()
        }
        Ok(None) => {
            push_notice(&session, Notice::error("Error", "Internship not found")).await;
            Redirect::to("/admin/internships").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load internship");
            push_notice(&session, Notice::error("Error", "Failed to load internship")).await;
            Redirect::to("/admin/internships").into_response()
        }
    }
}

/// Overwrite a posting.
#[instrument(skip(state, admin, session, form), fields(admin_id = %admin.id))]
pub async fn update<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<InternshipId>,
    Form(form): Form<InternshipForm>,
) -> Response {
    save(&state, &admin, &session, Some(id), form).await
}

/// Delete a posting.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn delete<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<InternshipId>,
) -> Redirect {
    let notice = internships::delete(state.backend(), &admin.access_token(), id).await;
    push_notice(&session, notice).await;
    Redirect::to("/admin/internships")
}

/// Move an application to any status.
#[instrument(skip(state, admin, session), fields(admin_id = %admin.id))]
pub async fn application_status<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<ApplicationId>,
    Form(form): Form<ApplicationStatusForm>,
) -> Redirect {
    let notice = match form.status.trim().parse::<ApplicationStatus>() {
        Ok(status) => {
            internships::set_application_status(state.backend(), &admin.access_token(), id, status)
                .await
        }
        Err(e) => Notice::error("Error", e.to_string()),
    };
    push_notice(&session, notice).await;
    Redirect::to("/admin/internships")
}

/// Replace the reviewer notes on an application.
#[instrument(skip(state, admin, session, form), fields(admin_id = %admin.id))]
pub async fn application_notes<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<ApplicationId>,
    Form(form): Form<NotesForm>,
) -> Redirect {
    let notice = internships::set_application_notes(
        state.backend(),
        &admin.access_token(),
        id,
        &form.admin_notes,
    )
    .await;
    push_notice(&session, notice).await;
    Redirect::to("/admin/internships")
}
