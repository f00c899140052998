//! Order management.

use pyrowarden_core::{OrderId, OrderStatus, Price};
use serde::Deserialize;
use tracing::instrument;

use super::{is_all, matches_search};
use crate::models::Notice;
use crate::supabase::{AccessToken, BackendResult, OrderBackend, OrderItem, OrderWithCustomer};

/// Query string of the orders page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderFilter {
    pub q: String,
    pub status: String,
}

impl OrderFilter {
    /// Rows matching search (order number, customer email or name) and status.
    #[must_use]
    pub fn apply<'a>(&self, orders: &'a [OrderWithCustomer]) -> Vec<&'a OrderWithCustomer> {
        let status = (!is_all(&self.status))
            .then(|| self.status.trim().parse::<OrderStatus>().ok())
            .flatten();

        orders
            .iter()
            .filter(|row| {
                let customer = row.customer.as_ref();
                matches_search(
                    &self.q,
                    &[
                        Some(row.order.order_number.as_str()),
                        customer.map(|c| c.email.as_str()),
                        customer.and_then(|c| c.full_name.as_deref()),
                    ],
                )
            })
            .filter(|row| status.is_none_or(|s| row.order.status == s))
            .collect()
    }
}

/// Per-status counts and revenue over every order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub shipped: usize,
    pub delivered: usize,
    pub cancelled: usize,
    pub total_revenue: Price,
}

impl OrderStats {
    #[must_use]
    pub fn of(orders: &[OrderWithCustomer]) -> Self {
        let count = |status: OrderStatus| orders.iter().filter(|o| o.order.status == status).count();
        Self {
            total: orders.len(),
            pending: count(OrderStatus::Pending),
            processing: count(OrderStatus::Processing),
            shipped: count(OrderStatus::Shipped),
            delivered: count(OrderStatus::Delivered),
            cancelled: count(OrderStatus::Cancelled),
            total_revenue: orders.iter().map(|o| o.order.total()).sum(),
        }
    }
}

/// An order with its line items.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: OrderWithCustomer,
    pub items: Vec<OrderItem>,
}

/// Load one order and its lines.
///
/// # Errors
///
/// Returns the backend error.
#[instrument(skip(backend, caller))]
pub async fn load_detail<B: OrderBackend>(
    backend: &B,
    caller: &AccessToken,
    id: OrderId,
) -> BackendResult<Option<OrderDetail>> {
    let Some(order) = backend.get_order(caller, id).await? else {
        return Ok(None);
    };
    let items = backend.list_order_items(caller, id).await?;
    Ok(Some(OrderDetail { order, items }))
}

/// Set an order's status.
///
/// Any status is accepted here; the dropdown only offers reachable ones.
#[instrument(skip(backend, caller))]
pub async fn update_status<B: OrderBackend>(
    backend: &B,
    caller: &AccessToken,
    id: OrderId,
    status: OrderStatus,
) -> Notice {
    match backend.update_order_status(caller, id, status).await {
        Ok(()) => {
            tracing::info!(order_id = %id, status = %status, "Order status updated");
            Notice::success("Success", "Order status updated successfully")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update order status");
            Notice::error("Error", "Failed to update order status")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pyrowarden_core::UserId;
    use rust_decimal::Decimal;

    use super::*;
    use crate::supabase::MemoryBackend;

    #[tokio::test]
    async fn test_stats_and_filters() {
        let backend = MemoryBackend::new();
        let ada = backend.register_user("ada@example.com", "hunter22", Some("Ada"));
        let bob = backend.register_user("bob@example.com", "hunter22", Some("Bob"));
        backend.seed_order(ada, Decimal::new(1000, 2), OrderStatus::Pending);
        backend.seed_order(ada, Decimal::new(2550, 2), OrderStatus::Shipped);
        backend.seed_order(bob, Decimal::new(450, 2), OrderStatus::Cancelled);
        let orders = backend.list_orders(&backend.service_token()).await.unwrap();

        let stats = OrderStats::of(&orders);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.shipped, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.total_revenue, Price::usd(Decimal::new(4000, 2)));

        let filter = OrderFilter {
            q: "ada".to_string(),
            status: "all".to_string(),
        };
        assert_eq!(filter.apply(&orders).len(), 2);

        let filter = OrderFilter {
            q: "PW-0000".to_string(),
            status: "cancelled".to_string(),
        };
        assert_eq!(filter.apply(&orders).len(), 1);
    }

    #[tokio::test]
    async fn test_detail_and_status_update() {
        let backend = MemoryBackend::new();
        let token = backend.service_token();
        let order = backend.seed_order(UserId::random(), Decimal::new(20, 0), OrderStatus::Delivered);

        // Terminal orders can still be moved by the handler.
        let notice = update_status(&backend, &token, order.id, OrderStatus::Pending).await;
        assert!(!notice.is_error());

        let detail = load_detail(&backend, &token, order.id).await.unwrap().unwrap();
        assert_eq!(detail.order.order.status, OrderStatus::Pending);
        assert!(detail.items.is_empty());

        assert!(load_detail(&backend, &token, OrderId::random()).await.unwrap().is_none());
    }
}
