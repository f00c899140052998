//! Wishlist synchronization.
//!
//! Same shape as the cart store, without quantities.

use pyrowarden_core::{ProductId, WishlistItemId};
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::models::{CurrentUser, Notice};
use crate::supabase::{BackendResult, NewWishlistItem, WishlistBackend, WishlistItem};

/// Notice for wishlist mutations attempted while signed out.
#[must_use]
pub fn sign_in_required() -> Notice {
    Notice::error(
        "Please sign in",
        "You need to be signed in to add items to wishlist",
    )
}

/// One visitor's wishlist for the duration of a request.
pub struct WishlistStore<'a, B> {
    backend: &'a B,
    user: Option<&'a CurrentUser>,
    refetch: bool,
    items: Vec<WishlistItem>,
}

impl<'a, B: WishlistBackend> WishlistStore<'a, B> {
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
    /// page which reads the wishlist again.
    #[must_use]
    pub const fn without_refetch(mut self) -> Self {
        self.refetch = false;
        self
    }

    #[must_use]
    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<WishlistItem> {
        self.items
    }

    /// Replace the local list with a fresh read. Without a user the list is
    /// emptied.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local list is left as it was.
    #[instrument(skip(self))]
    pub async fn fetch_wishlist(&mut self) -> BackendResult<()> {
        let Some(user) = self.user else {
            self.items.clear();
            return Ok(());
        };
        self.items = self
            .backend
            .list_wishlist_items(&user.access_token(), user.id)
            .await?;
        Ok(())
    }

    /// Add a product. A product already on the list is reported, not an error.
    #[instrument(skip(self))]
    pub async fn add_to_wishlist(&mut self, product_id: ProductId) -> Notice {
        let Some(user) = self.user else {
            return sign_in_required();
        };

        let item = NewWishlistItem {
            user_id: user.id,
            product_id,
        };
        match self
            .backend
            .insert_wishlist_item(&user.access_token(), &item)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_unique_violation() => {
                return Notice::info("Already in wishlist", "This item is already in your wishlist");
            }
            Err(e) => {
                tracing::error!(error = %e, product_id = %product_id, "Failed to add item to wishlist");
                return Notice::error("Error", "Failed to add item to wishlist");
            }
        }

        add_breadcrumb(
            "wishlist",
            "Added to wishlist",
            Some(&[("product_id", &product_id.to_string())]),
        );
        self.refresh().await;
        Notice::success("Added to wishlist", "Item has been added to your wishlist")
    }

    /// Delete one row.
    #[instrument(skip(self))]
    pub async fn remove_from_wishlist(&mut self, item_id: WishlistItemId) -> Notice {
        let Some(user) = self.user else {
            return sign_in_required();
        };

        if let Err(e) = self
            .backend
            .delete_wishlist_item(&user.access_token(), item_id)
            .await
        {
            tracing::error!(error = %e, item_id = %item_id, "Failed to remove item from wishlist");
            return Notice::error("Error", "Failed to remove item from wishlist");
        }

        add_breadcrumb("wishlist", "Removed from wishlist", None);
        self.refresh().await;
        Notice::success(
            "Removed from wishlist",
            "Item has been removed from your wishlist",
        )
    }

    /// Remove the product if it is on the last-fetched list, add it otherwise.
    pub async fn toggle(&mut self, product_id: ProductId) -> Notice {
        match self.item_for(product_id) {
            Some(item_id) => self.remove_from_wishlist(item_id).await,
            None => self.add_to_wishlist(product_id).await,
        }
    }

    /// Membership test against the last-fetched list.
    #[must_use]
    pub fn is_in_wishlist(&self, product_id: ProductId) -> bool {
        self.item_for(product_id).is_some()
    }

    fn item_for(&self, product_id: ProductId) -> Option<WishlistItemId> {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map(|item| item.id)
    }

    async fn refresh(&mut self) {
        if !self.refetch {
            return;
        }
        if let Err(e) = self.fetch_wishlist().await {
            tracing::warn!(error = %e, "Wishlist re-fetch failed after mutation");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use pyrowarden_core::{Email, ProductStatus};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::NoticeLevel;
    use crate::supabase::{AuthBackend, MemoryBackend, Product, ProductInput};

    fn seed(backend: &MemoryBackend) -> Product {
        backend.seed_product(ProductInput {
            name: "Flint Striker".to_string(),
            description: None,
            price: Decimal::new(1250, 2),
            compare_price: None,
            sku: Some("FS-1".to_string()),
            stock_quantity: 3,
            images: vec![],
            category: Some("Tools".to_string()),
            tags: vec![],
            status: ProductStatus::Active,
            featured: false,
        })
    }

    async fn signed_in(backend: &MemoryBackend) -> CurrentUser {
        backend.register_user("ada@example.com", "hunter22", None);
        let email = Email::parse("ada@example.com").unwrap();
        let session = backend
            .sign_in_with_password(&email, "hunter22")
            .await
            .unwrap();
        CurrentUser::from_session(&session, false, Utc::now())
    }

    #[tokio::test]
    async fn test_add_marks_membership() {
        let backend = MemoryBackend::new();
        let p = seed(&backend);
        let user = signed_in(&backend).await;
        let mut wishlist = WishlistStore::new(&backend, Some(&user));

        assert!(!wishlist.is_in_wishlist(p.id));
        let notice = wishlist.add_to_wishlist(p.id).await;
        assert_eq!(notice.level, NoticeLevel::Success);
        assert!(wishlist.is_in_wishlist(p.id));
    }

    #[tokio::test]
    async fn test_duplicate_add_is_informational() {
        let backend = MemoryBackend::new();
        let p = seed(&backend);
        let user = signed_in(&backend).await;
        let mut wishlist = WishlistStore::new(&backend, Some(&user));

        wishlist.add_to_wishlist(p.id).await;
        let notice = wishlist.add_to_wishlist(p.id).await;
        assert_eq!(notice.level, NoticeLevel::Info);
        assert_eq!(notice.title, "Already in wishlist");
        assert_eq!(backend.wishlist_rows(user.id), vec![p.id]);
    }

    #[tokio::test]
    async fn test_toggle_removes_then_adds() {
        let backend = MemoryBackend::new();
        let p = seed(&backend);
        let user = signed_in(&backend).await;
        let mut wishlist = WishlistStore::new(&backend, Some(&user));

        wishlist.toggle(p.id).await;
        assert!(wishlist.is_in_wishlist(p.id));
        let notice = wishlist.toggle(p.id).await;
        assert_eq!(notice.title, "Removed from wishlist");
        assert!(!wishlist.is_in_wishlist(p.id));
        assert!(backend.wishlist_rows(user.id).is_empty());
    }

    #[tokio::test]
    async fn test_signed_out_add_is_local_only() {
        let backend = MemoryBackend::new();
        let p = seed(&backend);
        let mut wishlist = WishlistStore::new(&backend, None);

        assert_eq!(wishlist.add_to_wishlist(p.id).await, sign_in_required());
        assert_eq!(backend.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_without_refetch_skips_read() {
        let backend = MemoryBackend::new();
        let p = seed(&backend);
        let user = signed_in(&backend).await;
        let mut wishlist = WishlistStore::new(&backend, Some(&user)).without_refetch();

        let reads = backend.read_count();
        wishlist.add_to_wishlist(p.id).await;
        assert_eq!(backend.read_count(), reads);
        assert!(!wishlist.is_in_wishlist(p.id));
        assert_eq!(backend.wishlist_rows(user.id), vec![p.id]);
    }
}
