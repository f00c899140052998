//! Table operations for [`SupabaseClient`].

use serde_json::json;
use tracing::instrument;

use pyrowarden_core::{
    ApplicationId, ApplicationStatus, CartItemId, Email, InternshipId, OrderId, OrderStatus,
    ProductId, ProductStatus, UserId, WishlistItemId, InternshipStatus,
};

use super::backend::{
    CartBackend, CatalogBackend, InternshipBackend, OrderBackend, ProfileBackend, WishlistBackend,
};
use super::client::SupabaseClient;
use super::query::RestQuery;
use super::types::{
    AccessToken, Application, ApplicationDetails, ApplicationWithContext, CartItem,
    CartItemUpsert, Internship, InternshipInput, NewApplication, NewWishlistItem, Order, OrderItem,
    OrderWithCustomer, Product, ProductInput, ProductQuery, Profile, ProfileUpdate, WishlistItem,
};
use super::BackendResult;

const CART_SELECT: &str =
    "id,product_id,quantity,product:products(id,name,price,images,stock_quantity)";
const WISHLIST_SELECT: &str = "id,product_id,product:products(id,name,price,images,compare_price)";
const ORDER_WITH_CUSTOMER_SELECT: &str = "*,profiles:user_id(email,full_name)";
const ORDER_ITEM_SELECT: &str = "*,product:products(name,images)";
const APPLICATION_SELECT: &str =
    "*,user_profile:profiles(full_name,email),internship:internships(title)";

// =============================================================================
// Profiles
// =============================================================================

impl ProfileBackend for SupabaseClient {
    #[instrument(skip(self, caller))]
    async fn list_profiles(&self, caller: &AccessToken) -> BackendResult<Vec<Profile>> {
        self.select(
            Some(caller),
            RestQuery::table("profiles")
                .select("*")
                .order("created_at", true),
        )
        .await
    }

    #[instrument(skip(self, caller), fields(user_id = %user_id))]
    async fn get_profile(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Option<Profile>> {
        self.select_one(
            Some(caller),
            RestQuery::table("profiles")
                .select("*")
                .eq("user_id", user_id),
        )
        .await
    }

    #[instrument(skip(self, caller, email))]
    async fn find_profile_by_email(
        &self,
        caller: &AccessToken,
        email: &Email,
    ) -> BackendResult<Option<Profile>> {
        self.select_one(
            Some(caller),
            RestQuery::table("profiles")
                .select("*")
                .eq("email", email),
        )
        .await
    }

    #[instrument(skip(self, caller, update), fields(user_id = %user_id))]
    async fn update_profile(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> BackendResult<()> {
        self.patch(
            caller,
            RestQuery::table("profiles").eq("user_id", user_id),
            update,
        )
        .await
    }

    async fn count_profiles(&self, caller: &AccessToken) -> BackendResult<u64> {
        self.count(Some(caller), RestQuery::table("profiles").select("id"))
            .await
    }
}

// =============================================================================
// Products
// =============================================================================

impl CatalogBackend for SupabaseClient {
    #[instrument(skip(self, caller))]
    async fn list_products(
        &self,
        caller: Option<&AccessToken>,
        query: ProductQuery,
    ) -> BackendResult<Vec<Product>> {
        let mut rest = RestQuery::table("products").select("*");
        if query.active_only {
            rest = rest.eq("status", ProductStatus::Active);
        }
        if query.featured_only {
            rest = rest.eq("featured", true);
        }
        rest = rest.order("created_at", true);
        if let Some(limit) = query.limit {
            rest = rest.limit(limit);
        }
        self.select(caller, rest).await
    }

    #[instrument(skip(self, caller), fields(product_id = %id))]
    async fn get_product(
        &self,
        caller: Option<&AccessToken>,
        id: ProductId,
        active_only: bool,
    ) -> BackendResult<Option<Product>> {
        let mut rest = RestQuery::table("products").select("*").eq("id", id);
        if active_only {
            rest = rest.eq("status", ProductStatus::Active);
        }
        self.select_one(caller, rest).await
    }

    #[instrument(skip(self, caller, input), fields(name = %input.name))]
    async fn create_product(
        &self,
        caller: &AccessToken,
        input: &ProductInput,
    ) -> BackendResult<Product> {
        self.insert_returning(caller, RestQuery::table("products").select("*"), input)
            .await
    }

    #[instrument(skip(self, caller, input), fields(product_id = %id))]
    async fn update_product(
        &self,
        caller: &AccessToken,
        id: ProductId,
        input: &ProductInput,
    ) -> BackendResult<()> {
        self.patch(caller, RestQuery::table("products").eq("id", id), input)
            .await
    }

    #[instrument(skip(self, caller), fields(product_id = %id))]
    async fn delete_product(&self, caller: &AccessToken, id: ProductId) -> BackendResult<()> {
        self.delete(caller, RestQuery::table("products").eq("id", id))
            .await
    }

    async fn count_products(&self, caller: &AccessToken) -> BackendResult<u64> {
        self.count(Some(caller), RestQuery::table("products").select("id"))
            .await
    }
}

// =============================================================================
// Cart
// =============================================================================

impl CartBackend for SupabaseClient {
    #[instrument(skip(self, caller), fields(user_id = %user_id))]
    async fn list_cart_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Vec<CartItem>> {
        self.select(
            Some(caller),
            RestQuery::table("cart_items")
                .select(CART_SELECT)
                .eq("user_id", user_id)
                .order("created_at", false),
        )
        .await
    }

    #[instrument(skip(self, caller, item), fields(product_id = %item.product_id, quantity = item.quantity))]
    async fn upsert_cart_item(
        &self,
        caller: &AccessToken,
        item: &CartItemUpsert,
    ) -> BackendResult<()> {
        self.insert(
            caller,
            RestQuery::table("cart_items").on_conflict("user_id,product_id"),
            item,
            "resolution=merge-duplicates,return=minimal",
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, caller), fields(item_id = %item_id))]
    async fn set_cart_item_quantity(
        &self,
        caller: &AccessToken,
        item_id: CartItemId,
        quantity: i32,
    ) -> BackendResult<()> {
        self.patch(
            caller,
            RestQuery::table("cart_items").eq("id", item_id),
            &json!({ "quantity": quantity }),
        )
        .await
    }

    #[instrument(skip(self, caller), fields(item_id = %item_id))]
    async fn delete_cart_item(&self, caller: &AccessToken, item_id: CartItemId) -> BackendResult<()> {
        self.delete(caller, RestQuery::table("cart_items").eq("id", item_id))
            .await
    }

    #[instrument(skip(self, caller), fields(user_id = %user_id))]
    async fn clear_cart(&self, caller: &AccessToken, user_id: UserId) -> BackendResult<()> {
        self.delete(caller, RestQuery::table("cart_items").eq("user_id", user_id))
            .await
    }

    async fn count_cart_items(&self, caller: &AccessToken, user_id: UserId) -> BackendResult<u64> {
        self.count(
            Some(caller),
            RestQuery::table("cart_items")
                .select("id")
                .eq("user_id", user_id),
        )
        .await
    }
}

// =============================================================================
// Wishlist
// =============================================================================

impl WishlistBackend for SupabaseClient {
    #[instrument(skip(self, caller), fields(user_id = %user_id))]
    async fn list_wishlist_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Vec<WishlistItem>> {
        self.select(
            Some(caller),
            RestQuery::table("wishlist_items")
                .select(WISHLIST_SELECT)
                .eq("user_id", user_id)
                .order("created_at", true),
        )
        .await
    }

    #[instrument(skip(self, caller, item), fields(product_id = %item.product_id))]
    async fn insert_wishlist_item(
        &self,
        caller: &AccessToken,
        item: &NewWishlistItem,
    ) -> BackendResult<()> {
        self.insert(
            caller,
            RestQuery::table("wishlist_items"),
            item,
            "return=minimal",
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, caller), fields(item_id = %item_id))]
    async fn delete_wishlist_item(
        &self,
        caller: &AccessToken,
        item_id: WishlistItemId,
    ) -> BackendResult<()> {
        self.delete(caller, RestQuery::table("wishlist_items").eq("id", item_id))
            .await
    }

    async fn count_wishlist_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<u64> {
        self.count(
            Some(caller),
            RestQuery::table("wishlist_items")
                .select("id")
                .eq("user_id", user_id),
        )
        .await
    }
}

// =============================================================================
// Orders
// =============================================================================

impl OrderBackend for SupabaseClient {
    #[instrument(skip(self, caller))]
    async fn list_orders(&self, caller: &AccessToken) -> BackendResult<Vec<OrderWithCustomer>> {
        self.select(
            Some(caller),
            RestQuery::table("orders")
                .select(ORDER_WITH_CUSTOMER_SELECT)
                .order("created_at", true),
        )
        .await
    }

    #[instrument(skip(self, caller), fields(user_id = %user_id))]
    async fn list_orders_for_user(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Vec<Order>> {
        self.select(
            Some(caller),
            RestQuery::table("orders")
                .select("*")
                .eq("user_id", user_id)
                .order("created_at", true),
        )
        .await
    }

    #[instrument(skip(self, caller), fields(order_id = %id))]
    async fn get_order(
        &self,
        caller: &AccessToken,
        id: OrderId,
    ) -> BackendResult<Option<OrderWithCustomer>> {
        self.select_one(
            Some(caller),
            RestQuery::table("orders")
                .select(ORDER_WITH_CUSTOMER_SELECT)
                .eq("id", id),
        )
        .await
    }

    #[instrument(skip(self, caller), fields(order_id = %order_id))]
    async fn list_order_items(
        &self,
        caller: &AccessToken,
        order_id: OrderId,
    ) -> BackendResult<Vec<OrderItem>> {
        self.select(
            Some(caller),
            RestQuery::table("order_items")
                .select(ORDER_ITEM_SELECT)
                .eq("order_id", order_id),
        )
        .await
    }

    #[instrument(skip(self, caller), fields(order_id = %id, status = %status))]
    async fn update_order_status(
        &self,
        caller: &AccessToken,
        id: OrderId,
        status: OrderStatus,
    ) -> BackendResult<()> {
        self.patch(
            caller,
            RestQuery::table("orders").eq("id", id),
            &json!({ "status": status }),
        )
        .await
    }

    async fn count_orders(
        &self,
        caller: &AccessToken,
        status: Option<OrderStatus>,
    ) -> BackendResult<u64> {
        let mut rest = RestQuery::table("orders").select("id");
        if let Some(status) = status {
            rest = rest.eq("status", status);
        }
        self.count(Some(caller), rest).await
    }
}

// =============================================================================
// Internships & applications
// =============================================================================

impl InternshipBackend for SupabaseClient {
    #[instrument(skip(self, caller))]
    async fn list_internships(
        &self,
        caller: Option<&AccessToken>,
        open_only: bool,
    ) -> BackendResult<Vec<Internship>> {
        let mut rest = RestQuery::table("internships").select("*");
        if open_only {
            rest = rest.eq("status", InternshipStatus::Open);
        }
        self.select(caller, rest.order("created_at", true)).await
    }

    #[instrument(skip(self, caller), fields(internship_id = %id))]
    async fn get_internship(
        &self,
        caller: Option<&AccessToken>,
        id: InternshipId,
    ) -> BackendResult<Option<Internship>> {
        self.select_one(
            caller,
            RestQuery::table("internships").select("*").eq("id", id),
        )
        .await
    }

    #[instrument(skip(self, caller, input), fields(title = %input.title))]
    async fn create_internship(
        &self,
        caller: &AccessToken,
        input: &InternshipInput,
    ) -> BackendResult<Internship> {
        self.insert_returning(caller, RestQuery::table("internships").select("*"), input)
            .await
    }

    #[instrument(skip(self, caller, input), fields(internship_id = %id))]
    async fn update_internship(
        &self,
        caller: &AccessToken,
        id: InternshipId,
        input: &InternshipInput,
    ) -> BackendResult<()> {
        self.patch(caller, RestQuery::table("internships").eq("id", id), input)
            .await
    }

    #[instrument(skip(self, caller), fields(internship_id = %id))]
    async fn delete_internship(&self, caller: &AccessToken, id: InternshipId) -> BackendResult<()> {
        self.delete(caller, RestQuery::table("internships").eq("id", id))
            .await
    }

    #[instrument(skip(self, caller))]
    async fn list_applications(
        &self,
        caller: &AccessToken,
    ) -> BackendResult<Vec<ApplicationWithContext>> {
        self.select(
            Some(caller),
            RestQuery::table("internship_applications")
                .select(APPLICATION_SELECT)
                .order("created_at", true),
        )
        .await
    }

    #[instrument(skip(self, caller), fields(internship_id = %internship_id, user_id = %user_id))]
    async fn find_application(
        &self,
        caller: &AccessToken,
        internship_id: InternshipId,
        user_id: UserId,
    ) -> BackendResult<Option<Application>> {
        self.select_one(
            Some(caller),
            RestQuery::table("internship_applications")
                .select("*")
                .eq("internship_id", internship_id)
                .eq("user_id", user_id),
        )
        .await
    }

    #[instrument(skip(self, caller, application), fields(internship_id = %application.internship_id))]
    async fn create_application(
        &self,
        caller: &AccessToken,
        application: &NewApplication,
    ) -> BackendResult<()> {
        self.insert(
            caller,
            RestQuery::table("internship_applications"),
            application,
            "return=minimal",
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, caller, details), fields(internship_id = %internship_id))]
    async fn update_application(
        &self,
        caller: &AccessToken,
        internship_id: InternshipId,
        user_id: UserId,
        details: &ApplicationDetails,
    ) -> BackendResult<()> {
        self.patch(
            caller,
            RestQuery::table("internship_applications")
                .eq("internship_id", internship_id)
                .eq("user_id", user_id),
            details,
        )
        .await
    }

    #[instrument(skip(self, caller), fields(application_id = %id, status = %status))]
    async fn update_application_status(
        &self,
        caller: &AccessToken,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> BackendResult<()> {
        self.patch(
            caller,
            RestQuery::table("internship_applications").eq("id", id),
            &json!({ "status": status }),
        )
        .await
    }

    #[instrument(skip(self, caller, admin_notes), fields(application_id = %id))]
    async fn update_application_notes(
        &self,
        caller: &AccessToken,
        id: ApplicationId,
        admin_notes: Option<&str>,
    ) -> BackendResult<()> {
        self.patch(
            caller,
            RestQuery::table("internship_applications").eq("id", id),
            &json!({ "admin_notes": admin_notes }),
        )
        .await
    }
}
