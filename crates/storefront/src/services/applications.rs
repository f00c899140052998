//! Internship listings and the application flow.

use pyrowarden_core::{ApplicationStatus, InternshipId};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::models::{CurrentUser, Notice};
use crate::services::forms::{self, FormError};
use crate::supabase::{
    Application, ApplicationDetails, BackendError, BackendResult, Internship, InternshipBackend,
    NewApplication,
};

/// Why an application could not be loaded or submitted.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("internship not found")]
    NotFound,

    #[error("internship is not accepting applications")]
    Closed,

    #[error("internship has reached its application limit")]
    Full,

    #[error("invalid application: {0}")]
    Invalid(#[from] FormError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl ApplyError {
    /// Notice shown after a failed submit.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::NotFound => Notice::error("Error", "Failed to fetch internship details"),
            Self::Closed => Notice::error(
                "Applications closed",
                "This internship is no longer accepting applications",
            ),
            Self::Full => Notice::error(
                "Applications closed",
                "This internship has reached its application limit",
            ),
            Self::Invalid(e) => Notice::error("Please check the form", e.to_string()),
            Self::Backend(_) => Notice::error("Error", "Failed to submit application"),
        }
    }
}

/// What a successful submit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Submitted,
    Updated,
}

impl Submission {
    #[must_use]
    pub fn notice(self) -> Notice {
        match self {
            Self::Submitted => Notice::success("Success", "Application submitted successfully"),
            Self::Updated => Notice::success("Success", "Application updated successfully"),
        }
    }
}

/// The application form as posted. Skills are one per line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationForm {
    pub cover_letter: String,
    pub resume_url: String,
    pub portfolio_url: String,
    pub github_url: String,
    pub linkedin_url: String,
    pub expected_graduation_date: String,
    pub current_education: String,
    pub relevant_experience: String,
    pub skills: String,
    pub availability_start: String,
    pub availability_end: String,
    pub notes: String,
}

impl ApplicationForm {
    /// Pre-fill from an existing application.
    #[must_use]
    pub fn from_details(details: &ApplicationDetails) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        let date = |value: Option<chrono::NaiveDate>| {
            value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
        };
        Self {
            cover_letter: text(&details.cover_letter),
            resume_url: text(&details.resume_url),
            portfolio_url: text(&details.portfolio_url),
            github_url: text(&details.github_url),
            linkedin_url: text(&details.linkedin_url),
            expected_graduation_date: date(details.expected_graduation_date),
            current_education: text(&details.current_education),
            relevant_experience: text(&details.relevant_experience),
            skills: details.skills.join("\n"),
            availability_start: date(details.availability_start),
            availability_end: date(details.availability_end),
            notes: text(&details.notes),
        }
    }

    /// Blank text becomes null, blank skills are dropped, empty dates are null.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` for a date field that is set but malformed.
    pub fn to_details(&self) -> Result<ApplicationDetails, FormError> {
        Ok(ApplicationDetails {
            cover_letter: forms::non_blank(&self.cover_letter),
            resume_url: forms::non_blank(&self.resume_url),
            portfolio_url: forms::non_blank(&self.portfolio_url),
            github_url: forms::non_blank(&self.github_url),
            linkedin_url: forms::non_blank(&self.linkedin_url),
            expected_graduation_date: forms::optional_date(
                &self.expected_graduation_date,
                "Expected graduation date",
            )?,
            current_education: forms::non_blank(&self.current_education),
            relevant_experience: forms::non_blank(&self.relevant_experience),
            skills: forms::split_lines(&self.skills),
            availability_start: forms::optional_date(
                &self.availability_start,
                "Availability start",
            )?,
            availability_end: forms::optional_date(&self.availability_end, "Availability end")?,
            notes: forms::non_blank(&self.notes),
        })
    }
}

/// Open internships, newest first.
///
/// # Errors
///
/// Returns the backend error.
pub async fn list_open<B: InternshipBackend>(backend: &B) -> BackendResult<Vec<Internship>> {
    backend.list_internships(None, true).await
}

/// Data for the apply page.
#[derive(Debug, Clone)]
pub struct ApplyPage {
    pub internship: Internship,
    /// The visitor's earlier application, if they have one.
    pub existing: Option<Application>,
}

/// Load an internship and, for a signed-in visitor, their application to it.
///
/// A failed lookup of the existing application is treated as "none".
///
/// # Errors
///
/// Returns `NotFound` if the internship does not exist.
#[instrument(skip(backend, user))]
pub async fn load_apply_page<B: InternshipBackend>(
    backend: &B,
    internship_id: InternshipId,
    user: Option<&CurrentUser>,
) -> Result<ApplyPage, ApplyError> {
    let token = user.map(CurrentUser::access_token);
    let internship = backend
        .get_internship(token.as_ref(), internship_id)
        .await?
        .ok_or(ApplyError::NotFound)?;

    let existing = match (user, token.as_ref()) {
        (Some(user), Some(token)) => backend
            .find_application(token, internship_id, user.id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to look up existing application");
                None
            }),
        _ => None,
    };

    Ok(ApplyPage {
        internship,
        existing,
    })
}

/// Submit or update the visitor's application.
///
/// An existing application is updated in place. A new one is inserted as
/// `pending`, and refused when the internship is closed or full.
///
/// # Errors
///
/// Returns `Invalid` for malformed input, `NotFound`/`Closed`/`Full` when a new
/// application cannot be accepted, and `Backend` for backend failures.
#[instrument(skip(backend, user, form), fields(user_id = %user.id))]
pub async fn submit<B: InternshipBackend>(
    backend: &B,
    user: &CurrentUser,
    internship_id: InternshipId,
    form: &ApplicationForm,
) -> Result<Submission, ApplyError> {
    let details = form.to_details()?;
    let token = user.access_token();

    let internship = backend
        .get_internship(Some(&token), internship_id)
        .await?
        .ok_or(ApplyError::NotFound)?;

    let existing = backend
        .find_application(&token, internship_id, user.id)
        .await?;

    if existing.is_some() {
        backend
            .update_application(&token, internship_id, user.id, &details)
            .await?;
        tracing::info!(internship_id = %internship_id, "Application updated");
        return Ok(Submission::Updated);
    }

    if !internship.status.accepts_applications() {
        return Err(ApplyError::Closed);
    }
    if internship.is_full() {
        return Err(ApplyError::Full);
    }

    let application = NewApplication {
        internship_id,
        user_id: user.id,
        status: ApplicationStatus::Pending,
        details,
    };
    backend.create_application(&token, &application).await?;
    tracing::info!(internship_id = %internship_id, "Application submitted");
    Ok(Submission::Submitted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use pyrowarden_core::{Email, InternshipStatus};

    use super::*;
    use crate::supabase::{AuthBackend, InternshipInput, MemoryBackend};

    fn internship(status: InternshipStatus, max: Option<i32>) -> InternshipInput {
        InternshipInput {
            title: "Firmware Intern".to_string(),
            description: "Sensor firmware".to_string(),
            requirements: vec!["C".to_string()],
            responsibilities: vec![],
            duration: "3 months".to_string(),
            location: "Remote".to_string(),
            kind: "remote".to_string(),
            department: "Engineering".to_string(),
            salary_range: None,
            benefits: vec![],
            status,
            max_applications: max,
            start_date: None,
            end_date: None,
        }
    }

    async fn signed_in(backend: &MemoryBackend, email: &str) -> CurrentUser {
        backend.register_user(email, "hunter22", None);
        let session = backend
            .sign_in_with_password(&Email::parse(email).unwrap(), "hunter22")
            .await
            .unwrap();
        CurrentUser::from_session(&session, false, Utc::now())
    }

    fn form() -> ApplicationForm {
        ApplicationForm {
            cover_letter: "Hello".to_string(),
            skills: "Rust\n\n  \nEmbedded C\n".to_string(),
            availability_start: "2026-06-01".to_string(),
            ..ApplicationForm::default()
        }
    }

    #[test]
    fn test_form_drops_blank_skills_and_dates() {
        let details = form().to_details().unwrap();
        assert_eq!(details.skills, ["Rust", "Embedded C"]);
        assert_eq!(details.availability_start, NaiveDate::from_ymd_opt(2026, 6, 1));
        assert_eq!(details.availability_end, None);
        assert_eq!(details.resume_url, None);
    }

    #[test]
    fn test_form_prefill_round_trips_skills() {
        let details = form().to_details().unwrap();
        let prefilled = ApplicationForm::from_details(&details);
        assert_eq!(prefilled.skills, "Rust\nEmbedded C");
        assert_eq!(prefilled.availability_start, "2026-06-01");
    }

    #[tokio::test]
    async fn test_submit_then_update() {
        let backend = MemoryBackend::new();
        let posting = backend.seed_internship(internship(InternshipStatus::Open, None));
        let user = signed_in(&backend, "ada@example.com").await;

        let result = submit(&backend, &user, posting.id, &form()).await.unwrap();
        assert_eq!(result, Submission::Submitted);

        let mut changed = form();
        changed.cover_letter = "Updated".to_string();
        let result = submit(&backend, &user, posting.id, &changed).await.unwrap();
        assert_eq!(result, Submission::Updated);

        let apps = backend.applications_of(user.id);
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].status, ApplicationStatus::Pending);
        assert_eq!(apps[0].details.cover_letter.as_deref(), Some("Updated"));
    }

    #[tokio::test]
    async fn test_new_application_refused_when_closed_or_full() {
        let backend = MemoryBackend::new();
        let closed = backend.seed_internship(internship(InternshipStatus::Closed, None));
        let full = backend.seed_internship(internship(InternshipStatus::Open, Some(1)));
        let first = signed_in(&backend, "first@example.com").await;
        let second = signed_in(&backend, "second@example.com").await;

        let err = submit(&backend, &first, closed.id, &form()).await.unwrap_err();
        assert!(matches!(err, ApplyError::Closed));

        submit(&backend, &first, full.id, &form()).await.unwrap();
        let err = submit(&backend, &second, full.id, &form()).await.unwrap_err();
        assert!(matches!(err, ApplyError::Full));
        assert!(backend.applications_of(second.id).is_empty());
    }

    #[tokio::test]
    async fn test_apply_page_prefills_existing() {
        let backend = MemoryBackend::new();
        let posting = backend.seed_internship(internship(InternshipStatus::Open, None));
        let user = signed_in(&backend, "ada@example.com").await;

        let page = load_apply_page(&backend, posting.id, Some(&user)).await.unwrap();
        assert!(page.existing.is_none());

        submit(&backend, &user, posting.id, &form()).await.unwrap();
        let page = load_apply_page(&backend, posting.id, Some(&user)).await.unwrap();
        assert!(page.existing.is_some());

        let anon = load_apply_page(&backend, posting.id, None).await.unwrap();
        assert!(anon.existing.is_none());
    }

    #[tokio::test]
    async fn test_unknown_internship() {
        let backend = MemoryBackend::new();
        let err = load_apply_page(&backend, InternshipId::random(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::NotFound));
    }
}
