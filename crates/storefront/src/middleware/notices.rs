//! Flash notices carried in the session.

use tower_sessions::Session;

use crate::models::{Notice, session_keys};

/// Queue a notice for the next rendered page.
///
/// A session store failure drops the notice and is logged.
pub async fn push_notice(session: &Session, notice: Notice) {
    let mut queued = session
        .get::<Vec<Notice>>(session_keys::NOTICES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    queued.push(notice);
    if let Err(e) = session.insert(session_keys::NOTICES, queued).await {
        tracing::warn!(error = %e, "Failed to queue notice");
    }
}

/// Take every queued notice, leaving none behind.
pub async fn take_notices(session: &Session) -> Vec<Notice> {
    match session.remove::<Vec<Notice>>(session_keys::NOTICES).await {
        Ok(notices) => notices.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read notices");
            Vec::new()
        }
    }
}
