//! Admin role management.
//!
//! The site decides who sees `/admin` from the `user_roles` table. These
//! commands edit that table with the service role key.

use pyrowarden_core::{AppRole, Email};
use pyrowarden_storefront::supabase::{ProfileBackend, RoleBackend};
use tracing::info;

use super::{CliError, Context};

/// Grant the admin role through the `assign_admin_by_email` function.
///
/// # Errors
///
/// Returns `CliError::UnknownUser` if no account has that email.
pub async fn grant(ctx: &Context, email: &Email) -> Result<(), CliError> {
    if !ctx.client.assign_admin_by_email(&ctx.service, email).await? {
        return Err(CliError::UnknownUser(email.to_string()));
    }
    info!("Granted admin to {email}");
    Ok(())
}

/// Delete the admin role row of the profile with `email`.
///
/// # Errors
///
/// Returns `CliError::UnknownUser` if no profile has that email.
pub async fn revoke(ctx: &Context, email: &Email) -> Result<(), CliError> {
    let profile = ctx
        .client
        .find_profile_by_email(&ctx.service, email)
        .await?
        .ok_or_else(|| CliError::UnknownUser(email.to_string()))?;
    ctx.client
        .revoke_role(&ctx.service, profile.user_id, AppRole::Admin)
        .await?;
    info!("Revoked admin from {email}");
    Ok(())
}

/// Print the roles of the user with `email`.
///
/// # Errors
///
/// Returns `CliError::UnknownUser` if no profile has that email.
pub async fn roles(ctx: &Context, email: &Email) -> Result<(), CliError> {
    let profile = ctx
        .client
        .find_profile_by_email(&ctx.service, email)
        .await?
        .ok_or_else(|| CliError::UnknownUser(email.to_string()))?;
    let roles = ctx
        .client
        .get_user_roles(&ctx.service, profile.user_id)
        .await?;

    if roles.is_empty() {
        info!("{email} has no roles");
    } else {
        let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        info!("{email}: {}", names.join(", "));
    }
    Ok(())
}
