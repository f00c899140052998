//! Cart synchronization.
//!
//! [`CartStore`] holds the visitor's cart lines as last read from the
//! backend. Every successful mutation is followed by a fresh read; a failed
//! mutation leaves the lines untouched and yields an error notice.

use pyrowarden_core::{CartItemId, Price, ProductId};
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::models::{CurrentUser, Notice};
use crate::supabase::{BackendResult, CartBackend, CartItem, CartItemUpsert};

/// Notice for cart mutations attempted while signed out.
#[must_use]
pub fn sign_in_required() -> Notice {
    Notice::error(
        "Please sign in",
        "You need to be signed in to add items to cart",
    )
}

/// One visitor's cart for the duration of a request.
pub struct CartStore<'a, B> {
    backend: &'a B,
    user: Option<&'a CurrentUser>,
    refetch: bool,
    items: Vec<CartItem>,
}

impl<'a, B: CartBackend> CartStore<'a, B> {
    /// An empty store; call [`Self::fetch_cart`] to load it.
    #[must_use]
    pub const fn new(backend: &'a B, user: Option<&'a CurrentUser>) -> Self {
        Self {
            backend,
            user,
            refetch: true,
            items: Vec::new(),
        }
    }

    /// Skip the read after each mutation. For form posts that redirect to a
    /// page which reads the cart again.
    #[must_use]
    pub const fn without_refetch(mut self) -> Self {
        self.refetch = false;
        self
    }

    /// Cart lines as of the last fetch.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    /// Replace the local lines with a fresh read.
    ///
    /// Without a user the cart is emptied and nothing is fetched.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local lines are left as they were.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&mut self) -> BackendResult<()> {
        let Some(user) = self.user else {
            self.items.clear();
            return Ok(());
        };
        self.items = self
            .backend
            .list_cart_items(&user.access_token(), user.id)
            .await?;
        Ok(())
    }

    /// Add a product, or overwrite the quantity if it is already in the cart.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&mut self, product_id: ProductId, quantity: i32) -> Notice {
        let Some(user) = self.user else {
            return sign_in_required();
        };

        let item = CartItemUpsert {
            user_id: user.id,
            product_id,
            quantity,
        };
        if let Err(e) = self
            .backend
            .upsert_cart_item(&user.access_token(), &item)
            .await
        {
            tracing::error!(error = %e, product_id = %product_id, "Failed to add item to cart");
            return Notice::error("Error", "Failed to add item to cart");
        }

        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[("product_id", &product_id.to_string())]),
        );
        self.refresh().await;
        Notice::success("Added to cart", "Item has been added to your cart")
    }

    /// Set a line's quantity. Zero or less removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(&mut self, item_id: CartItemId, quantity: i32) -> Option<Notice> {
        if quantity <= 0 {
            return Some(self.remove_from_cart(item_id).await);
        }
        let Some(user) = self.user else {
            return Some(sign_in_required());
        };

        if let Err(e) = self
            .backend
            .set_cart_item_quantity(&user.access_token(), item_id, quantity)
            .await
        {
            tracing::error!(error = %e, item_id = %item_id, "Failed to update quantity");
            return Some(Notice::error("Error", "Failed to update quantity"));
        }

        self.refresh().await;
        None
    }

    /// Delete one line.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&mut self, item_id: CartItemId) -> Notice {
        let Some(user) = self.user else {
            return sign_in_required();
        };

        if let Err(e) = self
            .backend
            .delete_cart_item(&user.access_token(), item_id)
            .await
        {
            tracing::error!(error = %e, item_id = %item_id, "Failed to remove item from cart");
            return Notice::error("Error", "Failed to remove item from cart");
        }

        add_breadcrumb("cart", "Removed from cart", None);
        self.refresh().await;
        Notice::success("Removed from cart", "Item has been removed from your cart")
    }

    /// Delete every line. Failures are only logged.
    #[instrument(skip(self))]
    pub async fn clear_cart(&mut self) -> Option<Notice> {
        let Some(user) = self.user else {
            return Some(sign_in_required());
        };

        match self.backend.clear_cart(&user.access_token(), user.id).await {
            Ok(()) => self.items.clear(),
            Err(e) => tracing::error!(error = %e, "Error clearing cart"),
        }
        None
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> i32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of `price × quantity`. Lines whose product is gone count as zero.
    #[must_use]
    pub fn total_price(&self) -> Price {
        Price::total(self.items.iter().filter_map(|item| {
            item.product
                .as_ref()
                .map(|product| (product.price(), item.quantity))
        }))
    }

    async fn refresh(&mut self) {
        if !self.refetch {
            return;
        }
        if let Err(e) = self.fetch_cart().await {
            tracing::warn!(error = %e, "Cart re-fetch failed after mutation");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use pyrowarden_core::{ProductStatus, UserId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::NoticeLevel;
    use crate::supabase::{AuthBackend, MemoryBackend, ProductInput};

    fn product(price: i64, stock: i32) -> ProductInput {
        ProductInput {
            name: "Ember Jacket".to_string(),
            description: None,
            price: Decimal::new(price, 0),
            compare_price: None,
            sku: None,
            stock_quantity: stock,
            images: vec![],
            category: None,
            tags: vec![],
            status: ProductStatus::Active,
            featured: false,
        }
    }

    async fn signed_in(backend: &MemoryBackend) -> CurrentUser {
        backend.register_user("ada@example.com", "hunter22", None);
        let email = pyrowarden_core::Email::parse("ada@example.com").unwrap();
        let session = backend
            .sign_in_with_password(&email, "hunter22")
            .await
            .unwrap();
        CurrentUser::from_session(&session, false, Utc::now())
    }

    #[tokio::test]
    async fn test_add_then_zero_quantity_empties_cart() {
        let backend = MemoryBackend::new();
        let p = backend.seed_product(product(10, 5));
        let user = signed_in(&backend).await;
        let mut cart = CartStore::new(&backend, Some(&user));

        let notice = cart.add_to_cart(p.id, 3).await;
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price(), Price::usd(Decimal::new(30, 0)));

        let item_id = cart.items()[0].id;
        cart.update_quantity(item_id, 0).await;
        assert!(cart.items().is_empty());
        assert!(backend.cart_rows(user.id).is_empty());
    }

    #[tokio::test]
    async fn test_adding_twice_keeps_one_row() {
        let backend = MemoryBackend::new();
        let p = backend.seed_product(product(10, 5));
        let user = signed_in(&backend).await;
        let mut cart = CartStore::new(&backend, Some(&user));

        cart.add_to_cart(p.id, 1).await;
        cart.add_to_cart(p.id, 2).await;
        assert_eq!(backend.cart_rows(user.id), vec![(p.id, 2)]);
        assert_eq!(cart.items().len(), 1);
    }

    #[tokio::test]
    async fn test_signed_out_mutations_touch_nothing() {
        let backend = MemoryBackend::new();
        let p = backend.seed_product(product(10, 5));
        let mut cart = CartStore::new(&backend, None);

        let notice = cart.add_to_cart(p.id, 1).await;
        assert_eq!(notice, sign_in_required());
        assert_eq!(backend.mutation_count(), 0);

        cart.fetch_cart().await.unwrap();
        assert!(cart.items().is_empty());
        assert!(backend.cart_rows(UserId::random()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_prior_lines() {
        let backend = MemoryBackend::new();
        let p = backend.seed_product(product(10, 5));
        let user = signed_in(&backend).await;
        let mut cart = CartStore::new(&backend, Some(&user));
        cart.add_to_cart(p.id, 1).await;

        backend.fail_writes(true);
        let item_id = cart.items()[0].id;
        let notice = cart.update_quantity(item_id, 4).await.unwrap();
        assert!(notice.is_error());
        assert_eq!(notice.description, "Failed to update quantity");
        assert_eq!(cart.total_items(), 1);
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let backend = MemoryBackend::new();
        let a = backend.seed_product(product(10, 5));
        let b = backend.seed_product(product(4, 5));
        let user = signed_in(&backend).await;
        let mut cart = CartStore::new(&backend, Some(&user));
        cart.add_to_cart(a.id, 1).await;
        cart.add_to_cart(b.id, 2).await;

        assert!(cart.clear_cart().await.is_none());
        assert!(cart.items().is_empty());
        assert!(backend.cart_rows(user.id).is_empty());
    }

    #[tokio::test]
    async fn test_without_refetch_skips_read() {
        let backend = MemoryBackend::new();
        let p = backend.seed_product(product(10, 5));
        let user = signed_in(&backend).await;
        let mut cart = CartStore::new(&backend, Some(&user)).without_refetch();

        let reads = backend.read_count();
        let notice = cart.add_to_cart(p.id, 2).await;
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(backend.read_count(), reads);
        assert!(cart.items().is_empty());
        assert_eq!(backend.cart_rows(user.id), vec![(p.id, 2)]);

        let mut cart = CartStore::new(&backend, Some(&user));
        cart.add_to_cart(p.id, 3).await;
        assert_eq!(backend.read_count(), reads + 1);
        assert_eq!(cart.total_items(), 3);
    }
}
