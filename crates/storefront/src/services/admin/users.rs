//! User management.

use futures::future::join_all;
use pyrowarden_core::{AppRole, UserId};
use serde::Deserialize;
use tracing::instrument;

use super::{is_all, matches_search};
use crate::models::Notice;
use crate::services::forms;
use crate::supabase::{AccessToken, BackendResult, Profile, ProfileBackend, RoleBackend};

/// A profile with its roles.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub profile: Profile,
    pub roles: Vec<AppRole>,
}

impl UserRow {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&AppRole::Admin)
    }
}

/// Role dropdown on the users page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleFilter {
    #[default]
    All,
    Admin,
    User,
}

impl RoleFilter {
    fn parse(value: &str) -> Self {
        match value.trim() {
            "admin" => Self::Admin,
            "user" => Self::User,
            _ => Self::All,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    fn matches(self, row: &UserRow) -> bool {
        match self {
            Self::All => true,
            Self::Admin => row.is_admin(),
            Self::User => !row.is_admin(),
        }
    }
}

/// Query string of the users page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserFilter {
    pub q: String,
    pub role: String,
}

impl UserFilter {
    #[must_use]
    pub fn role(&self) -> RoleFilter {
        if is_all(&self.role) {
            RoleFilter::All
        } else {
            RoleFilter::parse(&self.role)
        }
    }

    /// Rows matching the search text (email, name) and role.
    #[must_use]
    pub fn apply<'a>(&self, rows: &'a [UserRow]) -> Vec<&'a UserRow> {
        let role = self.role();
        rows.iter()
            .filter(|row| {
                matches_search(
                    &self.q,
                    &[
                        Some(row.profile.email.as_str()),
                        row.profile.full_name.as_deref(),
                    ],
                ) && role.matches(row)
            })
            .collect()
    }
}

/// Admin and non-admin totals for the summary cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserCounts {
    pub total: usize,
    pub admins: usize,
    pub users: usize,
}

impl UserCounts {
    #[must_use]
    pub fn of(rows: &[UserRow]) -> Self {
        let admins = rows.iter().filter(|row| row.is_admin()).count();
        Self {
            total: rows.len(),
            admins,
            users: rows.len() - admins,
        }
    }
}

/// Every profile, newest first, with roles.
///
/// A failed role lookup yields an empty role list for that user.
///
/// # Errors
///
/// Returns the backend error if profiles cannot be read.
#[instrument(skip(backend, caller))]
pub async fn list_users<B>(backend: &B, caller: &AccessToken) -> BackendResult<Vec<UserRow>>
where
    B: ProfileBackend + RoleBackend,
{
    let profiles = backend.list_profiles(caller).await?;
    let rows = join_all(
        profiles
            .into_iter()
            .map(|profile| async move { with_roles(backend, caller, profile).await }),
    )
    .await;
    Ok(rows)
}

/// One user with roles.
///
/// # Errors
///
/// Returns the backend error if the profile cannot be read.
pub async fn find_user<B>(
    backend: &B,
    caller: &AccessToken,
    user_id: UserId,
) -> BackendResult<Option<UserRow>>
where
    B: ProfileBackend + RoleBackend,
{
    match backend.get_profile(caller, user_id).await? {
        Some(profile) => Ok(Some(with_roles(backend, caller, profile).await)),
        None => Ok(None),
    }
}

async fn with_roles<B: RoleBackend>(backend: &B, caller: &AccessToken, profile: Profile) -> UserRow {
    let roles = backend
        .get_user_roles(caller, profile.user_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(user_id = %profile.user_id, error = %e, "Failed to fetch user roles");
            Vec::new()
        });
    UserRow { profile, roles }
}

/// The admin user edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub full_name: String,
    pub phone: String,
    /// `admin` or `user`.
    pub role: String,
}

impl UserForm {
    /// Pre-fill from a row.
    #[must_use]
    pub fn from_row(row: &UserRow) -> Self {
        Self {
            full_name: row.profile.full_name.clone().unwrap_or_default(),
            phone: row.profile.phone.clone().unwrap_or_default(),
            role: if row.is_admin() { "admin" } else { "user" }.to_string(),
        }
    }

    #[must_use]
    pub fn wants_admin(&self) -> bool {
        self.role.trim() == "admin"
    }
}

/// What to do with the admin role row on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Grant,
    Revoke,
    Unchanged,
}

impl RoleChange {
    #[must_use]
    pub const fn between(currently_admin: bool, should_be_admin: bool) -> Self {
        match (currently_admin, should_be_admin) {
            (false, true) => Self::Grant,
            (true, false) => Self::Revoke,
            _ => Self::Unchanged,
        }
    }
}

/// Save profile fields, then grant or revoke admin if the role changed.
///
/// The current roles are read fresh and must succeed: when they cannot be
/// read nothing is written, since a revoke would otherwise be skipped.
#[instrument(skip(backend, caller, form))]
pub async fn save_user<B>(backend: &B, caller: &AccessToken, user_id: UserId, form: &UserForm) -> Notice
where
    B: ProfileBackend + RoleBackend,
{
    match backend.get_profile(caller, user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Notice::error("Error", "User not found"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load user");
            return Notice::error("Error", "Failed to load user");
        }
    }
    let currently_admin = match backend.get_user_roles(caller, user_id).await {
        Ok(roles) => roles.contains(&AppRole::Admin),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load user roles");
            return Notice::error("Error", "Failed to load user roles");
        }
    };

    let update = crate::supabase::ProfileUpdate {
        full_name: forms::non_blank(&form.full_name),
        phone: forms::non_blank(&form.phone),
    };
    if let Err(e) = backend.update_profile(caller, user_id, &update).await {
        tracing::error!(error = %e, "Failed to update user profile");
        return Notice::error("Error", "Failed to update user profile");
    }

    match RoleChange::between(currently_admin, form.wants_admin()) {
        RoleChange::Grant => {
            if let Err(e) = backend.grant_role(caller, user_id, AppRole::Admin).await {
                tracing::error!(error = %e, "Failed to add admin role");
                return Notice::error("Error", "Failed to add admin role");
            }
            tracing::info!(user_id = %user_id, "Admin role granted");
        }
        RoleChange::Revoke => {
            if let Err(e) = backend.revoke_role(caller, user_id, AppRole::Admin).await {
                tracing::error!(error = %e, "Failed to remove admin role");
                return Notice::error("Error", "Failed to remove admin role");
            }
            tracing::info!(user_id = %user_id, "Admin role revoked");
        }
        RoleChange::Unchanged => {}
    }

    Notice::success("Success", "User updated successfully")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::supabase::MemoryBackend;

    #[test]
    fn test_role_change() {
        assert_eq!(RoleChange::between(false, true), RoleChange::Grant);
        assert_eq!(RoleChange::between(true, false), RoleChange::Revoke);
        assert_eq!(RoleChange::between(true, true), RoleChange::Unchanged);
        assert_eq!(RoleChange::between(false, false), RoleChange::Unchanged);
    }

    #[tokio::test]
    async fn test_filter_by_search_and_role() {
        let backend = MemoryBackend::new();
        let admin = backend.register_user("root@example.com", "hunter22", Some("Root"));
        backend.register_user("ada@example.com", "hunter22", Some("Ada Lovelace"));
        backend.seed_role(admin, AppRole::Admin);
        let rows = list_users(&backend, &backend.service_token()).await.unwrap();

        let filter = UserFilter {
            q: "lovelace".to_string(),
            role: "all".to_string(),
        };
        assert_eq!(filter.apply(&rows).len(), 1);

        let filter = UserFilter {
            q: String::new(),
            role: "admin".to_string(),
        };
        let admins = filter.apply(&rows);
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].profile.user_id, admin);

        let counts = UserCounts::of(&rows);
        assert_eq!((counts.total, counts.admins, counts.users), (2, 1, 1));
    }

    #[tokio::test]
    async fn test_role_lookup_failure_gives_empty_roles() {
        let backend = MemoryBackend::new();
        let id = backend.register_user("root@example.com", "hunter22", None);
        backend.seed_role(id, AppRole::Admin);
        backend.fail_role_checks(true);

        let rows = list_users(&backend, &backend.service_token()).await.unwrap();
        assert!(rows[0].roles.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_admin_round_trip() {
        let backend = MemoryBackend::new();
        let id = backend.register_user("ada@example.com", "hunter22", None);
        let token = backend.service_token();

        let row = find_user(&backend, &token, id).await.unwrap().unwrap();
        let mut form = UserForm::from_row(&row);
        form.role = "admin".to_string();
        assert!(!save_user(&backend, &token, id, &form).await.is_error());
        assert!(backend.has_role(&token, id, AppRole::Admin).await.unwrap());

        form.role = "user".to_string();
        assert!(!save_user(&backend, &token, id, &form).await.is_error());
        assert!(!backend.has_role(&token, id, AppRole::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_unchanged_role_issues_no_role_write() {
        let backend = MemoryBackend::new();
        let id = backend.register_user("ada@example.com", "hunter22", None);
        let token = backend.service_token();
        let row = find_user(&backend, &token, id).await.unwrap().unwrap();

        let before = backend.mutation_count();
        save_user(&backend, &token, id, &UserForm::from_row(&row)).await;
        // Only the profile update.
        assert_eq!(backend.mutation_count(), before + 1);
    }

    #[tokio::test]
    async fn test_unknown_roles_block_save() {
        let backend = MemoryBackend::new();
        let id = backend.register_user("root@example.com", "hunter22", Some("Root"));
        backend.seed_role(id, AppRole::Admin);
        let token = backend.service_token();

        // The edit page was rendered while role lookups were failing.
        backend.fail_role_checks(true);
        let row = find_user(&backend, &token, id).await.unwrap().unwrap();
        assert!(row.roles.is_empty());

        let before = backend.mutation_count();
        let form = UserForm {
            full_name: "Renamed".to_string(),
            role: "user".to_string(),
            ..UserForm::from_row(&row)
        };
        let notice = save_user(&backend, &token, id, &form).await;
        assert!(notice.is_error());
        assert_eq!(notice.description, "Failed to load user roles");
        assert_eq!(backend.mutation_count(), before);

        backend.fail_role_checks(false);
        assert!(backend.has_role(&token, id, AppRole::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_unknown_user() {
        let backend = MemoryBackend::new();
        let notice =
            save_user(&backend, &backend.service_token(), UserId::random(), &UserForm::default())
                .await;
        assert_eq!(notice.description, "User not found");
    }
}
