//! Customer dashboard and profile.

use pyrowarden_core::Price;
use serde::Deserialize;
use tracing::instrument;

use crate::models::{CurrentUser, Notice};
use crate::services::forms;
use crate::supabase::{
    BackendResult, CartBackend, Order, OrderBackend, Profile, ProfileBackend, ProfileUpdate,
    WishlistBackend,
};

/// Orders shown in the dashboard's "recent orders" card.
pub const RECENT_ORDERS: usize = 5;

/// Headline numbers for the customer dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_orders: usize,
    pub total_spent: Price,
    pub cart_items: u64,
    pub wishlist_items: u64,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_orders: Vec<Order>,
}

/// Load the dashboard for `user`.
///
/// # Errors
///
/// Returns the first backend error.
#[instrument(skip(backend, user), fields(user_id = %user.id))]
pub async fn load_dashboard<B>(backend: &B, user: &CurrentUser) -> BackendResult<Dashboard>
where
    B: OrderBackend + CartBackend + WishlistBackend,
{
    let token = user.access_token();
    let (mut orders, cart_items, wishlist_items) = futures::try_join!(
        backend.list_orders_for_user(&token, user.id),
        backend.count_cart_items(&token, user.id),
        backend.count_wishlist_items(&token, user.id),
    )?;

    let total_spent = orders.iter().map(Order::total).sum();
    let stats = DashboardStats {
        total_orders: orders.len(),
        total_spent,
        cart_items,
        wishlist_items,
    };

    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders.truncate(RECENT_ORDERS);

    Ok(Dashboard {
        stats,
        recent_orders: orders,
    })
}

/// The posted profile form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub full_name: String,
    pub phone: String,
}

impl ProfileForm {
    #[must_use]
    pub fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            full_name: forms::non_blank(&self.full_name),
            phone: forms::non_blank(&self.phone),
        }
    }
}

/// The signed-in user's own profile row.
///
/// # Errors
///
/// Returns the backend error.
pub async fn load_profile<B: ProfileBackend>(
    backend: &B,
    user: &CurrentUser,
) -> BackendResult<Option<Profile>> {
    backend.get_profile(&user.access_token(), user.id).await
}

/// Save name and phone.
#[instrument(skip(backend, user, form), fields(user_id = %user.id))]
pub async fn save_profile<B: ProfileBackend>(
    backend: &B,
    user: &CurrentUser,
    form: &ProfileForm,
) -> Notice {
    match backend
        .update_profile(&user.access_token(), user.id, &form.to_update())
        .await
    {
        Ok(()) => Notice::success("Profile updated", "Your profile has been saved"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update profile");
            Notice::error("Error", "Failed to update profile")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use pyrowarden_core::{Email, OrderStatus, UserId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::supabase::{AuthBackend, MemoryBackend};

    async fn signed_in(backend: &MemoryBackend) -> CurrentUser {
        backend.register_user("ada@example.com", "hunter22", Some("Ada"));
        let session = backend
            .sign_in_with_password(&Email::parse("ada@example.com").unwrap(), "hunter22")
            .await
            .unwrap();
        CurrentUser::from_session(&session, false, Utc::now())
    }

    #[tokio::test]
    async fn test_dashboard_counts_only_own_orders() {
        let backend = MemoryBackend::new();
        let user = signed_in(&backend).await;
        for _ in 0..6 {
            backend.seed_order(user.id, Decimal::new(1000, 2), OrderStatus::Delivered);
        }
        backend.seed_order(UserId::random(), Decimal::new(9999, 2), OrderStatus::Pending);

        let dashboard = load_dashboard(&backend, &user).await.unwrap();
        assert_eq!(dashboard.stats.total_orders, 6);
        assert_eq!(dashboard.stats.total_spent, Price::usd(Decimal::new(60, 0)));
        assert_eq!(dashboard.stats.cart_items, 0);
        assert_eq!(dashboard.recent_orders.len(), RECENT_ORDERS);
    }

    #[tokio::test]
    async fn test_profile_update_clears_blank_phone() {
        let backend = MemoryBackend::new();
        let user = signed_in(&backend).await;
        let form = ProfileForm {
            full_name: " Ada Lovelace ".to_string(),
            phone: "  ".to_string(),
        };

        let notice = save_profile(&backend, &user, &form).await;
        assert!(!notice.is_error());

        let profile = load_profile(&backend, &user).await.unwrap().unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.phone, None);
    }
}
