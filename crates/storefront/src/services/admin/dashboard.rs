//! Admin dashboard totals.

use pyrowarden_core::{OrderStatus, Price};

use crate::supabase::{AccessToken, BackendResult, CatalogBackend, OrderBackend, ProfileBackend};

/// Headline numbers on `/admin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub pending_orders: u64,
    /// Sum of every order total.
    pub revenue: Price,
}

/// Gather the dashboard totals.
///
/// # Errors
///
/// Returns the first backend error.
#[tracing::instrument(skip_all)]
pub async fn load_stats<B>(backend: &B, caller: &AccessToken) -> BackendResult<AdminStats>
where
    B: ProfileBackend + CatalogBackend + OrderBackend,
{
    let (total_users, total_products, total_orders, pending_orders, orders) = futures::try_join!(
        backend.count_profiles(caller),
        backend.count_products(caller),
        backend.count_orders(caller, None),
        backend.count_orders(caller, Some(OrderStatus::Pending)),
        backend.list_orders(caller),
    )?;

    Ok(AdminStats {
        total_users,
        total_products,
        total_orders,
        pending_orders,
        revenue: orders.iter().map(|row| row.order.total()).sum(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::supabase::MemoryBackend;

    #[tokio::test]
    async fn test_stats() {
        let backend = MemoryBackend::new();
        let ada = backend.register_user("ada@example.com", "hunter22", None);
        backend.register_user("bob@example.com", "hunter22", None);
        backend.seed_order(ada, Decimal::new(1000, 2), OrderStatus::Pending);
        backend.seed_order(ada, Decimal::new(500, 2), OrderStatus::Delivered);

        let stats = load_stats(&backend, &backend.service_token()).await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_products, 0);
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.revenue, Price::usd(Decimal::new(15, 0)));
    }
}
