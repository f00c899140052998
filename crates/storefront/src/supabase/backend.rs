//! Backend seams.
//!
//! One trait per concern. Callers pass the caller's [`AccessToken`] so the
//! backend can apply row level security; reads of public data take an
//! `Option` and fall back to the anon key.

use pyrowarden_core::{
    AppRole, ApplicationId, ApplicationStatus, CartItemId, Email, InternshipId, OrderId,
    OrderStatus, ProductId, UserId, WishlistItemId,
};

use super::BackendResult;
use super::types::{
    AccessToken, Application, ApplicationDetails, ApplicationWithContext, AuthSession, AuthUser,
    CartItem, CartItemUpsert, Internship, InternshipInput, NewApplication, NewWishlistItem, Order,
    OrderItem, OrderWithCustomer, Product, ProductInput, ProductQuery, Profile, ProfileUpdate,
    SignUpOutcome, SignUpRequest, WishlistItem,
};

/// Password auth and token lifecycle.
pub trait AuthBackend: Send + Sync {
    /// Exchange email and password for a session.
    fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = BackendResult<AuthSession>> + Send;

    /// Register a new account.
    fn sign_up(
        &self,
        request: &SignUpRequest,
    ) -> impl Future<Output = BackendResult<SignUpOutcome>> + Send;

    /// Revoke the caller's refresh tokens.
    fn sign_out(&self, caller: &AccessToken) -> impl Future<Output = BackendResult<()>> + Send;

    /// The user the token belongs to.
    fn get_user(&self, caller: &AccessToken)
    -> impl Future<Output = BackendResult<AuthUser>> + Send;

    /// Trade a refresh token for a new session.
    fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = BackendResult<AuthSession>> + Send;
}

/// Role lookups (RPC) and role row management.
pub trait RoleBackend: Send + Sync {
    /// `has_role(_user_id, _role)`.
    fn has_role(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        role: AppRole,
    ) -> impl Future<Output = BackendResult<bool>> + Send;

    /// `get_user_roles(_user_id)`.
    fn get_user_roles(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Vec<AppRole>>> + Send;

    /// Insert a `user_roles` row.
    fn grant_role(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        role: AppRole,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Delete the `user_roles` row for `(user_id, role)`.
    fn revoke_role(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        role: AppRole,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// `assign_admin_by_email(_email)`. Returns false when no user has that email.
    fn assign_admin_by_email(
        &self,
        caller: &AccessToken,
        email: &Email,
    ) -> impl Future<Output = BackendResult<bool>> + Send;
}

/// The `profiles` table.
pub trait ProfileBackend: Send + Sync {
    /// All profiles, newest first.
    fn list_profiles(
        &self,
        caller: &AccessToken,
    ) -> impl Future<Output = BackendResult<Vec<Profile>>> + Send;

    /// The profile of one user.
    fn get_profile(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Option<Profile>>> + Send;

    /// Look a profile up by email address.
    fn find_profile_by_email(
        &self,
        caller: &AccessToken,
        email: &Email,
    ) -> impl Future<Output = BackendResult<Option<Profile>>> + Send;

    /// Update name and phone.
    fn update_profile(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Exact row count.
    fn count_profiles(&self, caller: &AccessToken)
    -> impl Future<Output = BackendResult<u64>> + Send;
}

/// The `products` table.
pub trait CatalogBackend: Send + Sync {
    /// Products matching `query`, newest first.
    fn list_products(
        &self,
        caller: Option<&AccessToken>,
        query: ProductQuery,
    ) -> impl Future<Output = BackendResult<Vec<Product>>> + Send;

    /// One product. With `active_only`, inactive products read as missing.
    fn get_product(
        &self,
        caller: Option<&AccessToken>,
        id: ProductId,
        active_only: bool,
    ) -> impl Future<Output = BackendResult<Option<Product>>> + Send;

    /// Insert a product.
    fn create_product(
        &self,
        caller: &AccessToken,
        input: &ProductInput,
    ) -> impl Future<Output = BackendResult<Product>> + Send;

    /// Overwrite a product's editable columns.
    fn update_product(
        &self,
        caller: &AccessToken,
        id: ProductId,
        input: &ProductInput,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Delete a product.
    fn delete_product(
        &self,
        caller: &AccessToken,
        id: ProductId,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Exact row count.
    fn count_products(&self, caller: &AccessToken)
    -> impl Future<Output = BackendResult<u64>> + Send;
}

/// The `cart_items` table.
pub trait CartBackend: Send + Sync {
    /// A user's cart lines joined with product details.
    fn list_cart_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Vec<CartItem>>> + Send;

    /// Insert, or overwrite the quantity of the existing `(user, product)` row.
    fn upsert_cart_item(
        &self,
        caller: &AccessToken,
        item: &CartItemUpsert,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Set a line's quantity.
    fn set_cart_item_quantity(
        &self,
        caller: &AccessToken,
        item_id: CartItemId,
        quantity: i32,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Delete one line.
    fn delete_cart_item(
        &self,
        caller: &AccessToken,
        item_id: CartItemId,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Delete every line owned by `user_id`.
    fn clear_cart(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Number of lines (not units) in a user's cart.
    fn count_cart_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<u64>> + Send;
}

/// The `wishlist_items` table.
pub trait WishlistBackend: Send + Sync {
    /// A user's wishlist joined with product details.
    fn list_wishlist_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Vec<WishlistItem>>> + Send;

    /// Insert a row. A duplicate fails with [`super::UNIQUE_VIOLATION`].
    fn insert_wishlist_item(
        &self,
        caller: &AccessToken,
        item: &NewWishlistItem,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Delete one row.
    fn delete_wishlist_item(
        &self,
        caller: &AccessToken,
        item_id: WishlistItemId,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Number of rows in a user's wishlist.
    fn count_wishlist_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<u64>> + Send;
}

/// The `orders` and `order_items` tables.
pub trait OrderBackend: Send + Sync {
    /// Every order with its customer, newest first.
    fn list_orders(
        &self,
        caller: &AccessToken,
    ) -> impl Future<Output = BackendResult<Vec<OrderWithCustomer>>> + Send;

    /// One user's orders, newest first.
    fn list_orders_for_user(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Vec<Order>>> + Send;

    /// One order with its customer.
    fn get_order(
        &self,
        caller: &AccessToken,
        id: OrderId,
    ) -> impl Future<Output = BackendResult<Option<OrderWithCustomer>>> + Send;

    /// Lines of one order joined with product name and images.
    fn list_order_items(
        &self,
        caller: &AccessToken,
        order_id: OrderId,
    ) -> impl Future<Output = BackendResult<Vec<OrderItem>>> + Send;

    /// Set an order's status.
    fn update_order_status(
        &self,
        caller: &AccessToken,
        id: OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Exact count, optionally restricted to one status.
    fn count_orders(
        &self,
        caller: &AccessToken,
        status: Option<OrderStatus>,
    ) -> impl Future<Output = BackendResult<u64>> + Send;
}

/// The `internships` and `internship_applications` tables.
pub trait InternshipBackend: Send + Sync {
    /// Internships newest first, optionally only the open ones.
    fn list_internships(
        &self,
        caller: Option<&AccessToken>,
        open_only: bool,
    ) -> impl Future<Output = BackendResult<Vec<Internship>>> + Send;

    /// One internship.
    fn get_internship(
        &self,
        caller: Option<&AccessToken>,
        id: InternshipId,
    ) -> impl Future<Output = BackendResult<Option<Internship>>> + Send;

    /// Insert an internship.
    fn create_internship(
        &self,
        caller: &AccessToken,
        input: &InternshipInput,
    ) -> impl Future<Output = BackendResult<Internship>> + Send;

    /// Overwrite an internship's editable columns.
    fn update_internship(
        &self,
        caller: &AccessToken,
        id: InternshipId,
        input: &InternshipInput,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Delete an internship.
    fn delete_internship(
        &self,
        caller: &AccessToken,
        id: InternshipId,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Every application with applicant and internship title, newest first.
    fn list_applications(
        &self,
        caller: &AccessToken,
    ) -> impl Future<Output = BackendResult<Vec<ApplicationWithContext>>> + Send;

    /// The caller's application to one internship, if any.
    fn find_application(
        &self,
        caller: &AccessToken,
        internship_id: InternshipId,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Option<Application>>> + Send;

    /// Insert an application.
    fn create_application(
        &self,
        caller: &AccessToken,
        application: &NewApplication,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Overwrite the applicant-editable fields of `(internship, user)`.
    fn update_application(
        &self,
        caller: &AccessToken,
        internship_id: InternshipId,
        user_id: UserId,
        details: &ApplicationDetails,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Set an application's review status.
    fn update_application_status(
        &self,
        caller: &AccessToken,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Replace the reviewer notes on an application.
    fn update_application_notes(
        &self,
        caller: &AccessToken,
        id: ApplicationId,
        admin_notes: Option<&str>,
    ) -> impl Future<Output = BackendResult<()>> + Send;
}

/// Everything the site needs from the backend.
pub trait Backend:
    AuthBackend
    + RoleBackend
    + ProfileBackend
    + CatalogBackend
    + CartBackend
    + WishlistBackend
    + OrderBackend
    + InternshipBackend
    + 'static
{
}

impl<T> Backend for T where
    T: AuthBackend
        + RoleBackend
        + ProfileBackend
        + CatalogBackend
        + CartBackend
        + WishlistBackend
        + OrderBackend
        + InternshipBackend
        + 'static
{
}
