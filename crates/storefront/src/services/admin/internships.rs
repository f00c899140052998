//! Internship postings and application review.

use pyrowarden_core::{ApplicationId, ApplicationStatus, InternshipId, InternshipStatus};
use serde::Deserialize;
use tracing::instrument;

use crate::models::Notice;
use crate::services::forms::{self, FormError};
use crate::supabase::{
    AccessToken, ApplicationWithContext, BackendResult, Internship, InternshipBackend,
    InternshipInput,
};

/// Everything the internships admin page shows.
#[derive(Debug, Clone)]
pub struct InternshipsOverview {
    pub internships: Vec<Internship>,
    pub applications: Vec<ApplicationWithContext>,
}

/// Load postings and applications together.
///
/// # Errors
///
/// Returns the first backend error.
#[instrument(skip(backend, caller))]
pub async fn load_overview<B: InternshipBackend>(
    backend: &B,
    caller: &AccessToken,
) -> BackendResult<InternshipsOverview> {
    let (internships, applications) = futures::try_join!(
        backend.list_internships(Some(caller), false),
        backend.list_applications(caller),
    )?;
    Ok(InternshipsOverview {
        internships,
        applications,
    })
}

/// The internship create/edit form. List fields are one item per line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InternshipForm {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub responsibilities: String,
    pub duration: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub department: String,
    pub salary_range: String,
    pub benefits: String,
    pub status: String,
    pub max_applications: String,
    pub start_date: String,
    pub end_date: String,
}

impl Default for InternshipForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            requirements: String::new(),
            responsibilities: String::new(),
            duration: String::new(),
            location: String::new(),
            kind: "remote".to_string(),
            department: String::new(),
            salary_range: String::new(),
            benefits: String::new(),
            status: InternshipStatus::Open.as_str().to_string(),
            max_applications: String::new(),
            start_date: String::new(),
            end_date: String::new(),
        }
    }
}

impl InternshipForm {
    /// Pre-fill from an existing posting.
    #[must_use]
    pub fn from_internship(internship: &Internship) -> Self {
        let date = |value: Option<chrono::NaiveDate>| {
            value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
        };
        Self {
            title: internship.title.clone(),
            description: internship.description.clone(),
            requirements: internship.requirements.join("\n"),
            responsibilities: internship.responsibilities.join("\n"),
            duration: internship.duration.clone(),
            location: internship.location.clone(),
            kind: internship.kind.clone(),
            department: internship.department.clone(),
            salary_range: internship.salary_range.clone().unwrap_or_default(),
            benefits: internship.benefits.join("\n"),
            status: internship.status.as_str().to_string(),
            max_applications: internship
                .max_applications
                .map(|max| max.to_string())
                .unwrap_or_default(),
            start_date: date(internship.start_date),
            end_date: date(internship.end_date),
        }
    }

    /// Build the insert/update payload. Blank list lines are dropped.
    ///
    /// # Errors
    ///
    /// Returns a `FormError` for a missing required field or a malformed
    /// number, date or status.
    pub fn parse(&self) -> Result<InternshipInput, FormError> {
        Ok(InternshipInput {
            title: forms::required(&self.title, "Title")?,
            description: forms::required(&self.description, "Description")?,
            requirements: forms::split_lines(&self.requirements),
            responsibilities: forms::split_lines(&self.responsibilities),
            duration: forms::required(&self.duration, "Duration")?,
            location: forms::required(&self.location, "Location")?,
            kind: forms::required(&self.kind, "Type")?,
            department: forms::required(&self.department, "Department")?,
            salary_range: forms::non_blank(&self.salary_range),
            benefits: forms::split_lines(&self.benefits),
            status: forms::choice(&self.status, "Status")?,
            max_applications: forms::optional_integer(&self.max_applications, "Max applications")?,
            start_date: forms::optional_date(&self.start_date, "Start date")?,
            end_date: forms::optional_date(&self.end_date, "End date")?,
        })
    }
}

/// Insert or overwrite a posting.
#[instrument(skip(backend, caller, input), fields(title = %input.title))]
pub async fn save<B: InternshipBackend>(
    backend: &B,
    caller: &AccessToken,
    id: Option<InternshipId>,
    input: &InternshipInput,
) -> Notice {
    let result = match id {
        Some(id) => backend
            .update_internship(caller, id, input)
            .await
            .map(|()| "Internship updated successfully"),
        None => backend
            .create_internship(caller, input)
            .await
            .map(|_| "Internship created successfully"),
    };
    match result {
        Ok(message) => Notice::success("Success", message),
        Err(e) => {
            tracing::error!(error = %e, "Failed to save internship");
            Notice::error("Error", "Failed to save internship")
        }
    }
}

/// Delete a posting.
#[instrument(skip(backend, caller))]
pub async fn delete<B: InternshipBackend>(
    backend: &B,
    caller: &AccessToken,
    id: InternshipId,
) -> Notice {
    match backend.delete_internship(caller, id).await {
        Ok(()) => Notice::success("Success", "Internship deleted successfully"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete internship");
            Notice::error("Error", "Failed to delete internship")
        }
    }
}

/// Set an application's review status. Any status may follow any other.
#[instrument(skip(backend, caller))]
pub async fn set_application_status<B: InternshipBackend>(
    backend: &B,
    caller: &AccessToken,
    id: ApplicationId,
    status: ApplicationStatus,
) -> Notice {
    match backend.update_application_status(caller, id, status).await {
        Ok(()) => Notice::success("Success", "Application status updated"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update application status");
            Notice::error("Error", "Failed to update application status")
        }
    }
}

/// Replace the reviewer notes on an application. Blank clears them.
#[instrument(skip(backend, caller, notes))]
pub async fn set_application_notes<B: InternshipBackend>(
    backend: &B,
    caller: &AccessToken,
    id: ApplicationId,
    notes: &str,
) -> Notice {
    let notes = forms::non_blank(notes);
    match backend
        .update_application_notes(caller, id, notes.as_deref())
        .await
    {
        Ok(()) => Notice::success("Success", "Admin notes saved"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to save admin notes");
            Notice::error("Error", "Failed to save admin notes")
        }
    }
}
