//! In-memory backend for tests and local experiments.
//!
//! Implements every backend trait over plain `Vec`s behind one mutex and
//! emulates the parts of the hosted project the site relies on:
//!
//! - tokens map to users; unknown tokens fail with `401`/`PGRST301`
//! - `(user, product)` is unique in `cart_items` (upsert overwrites) and in
//!   `wishlist_items` (insert fails with `23505`)
//! - row ownership and admin-only writes, the way the RLS policies do it:
//!   forbidden inserts fail with `42501`, forbidden updates and deletes match
//!   no rows
//! - the application counter trigger on `internship_applications`
//!
//! Every mutating call is counted so tests can assert that a guarded
//! operation never reached the backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;

use pyrowarden_core::{
    AppRole, ApplicationId, ApplicationStatus, CartItemId, Email, InternshipId, OrderId,
    OrderItemId, OrderStatus, ProductId, ProductStatus, ProfileId, RoleId, UserId, WishlistItemId,
};

use super::backend::{
    AuthBackend, CartBackend, CatalogBackend, InternshipBackend, OrderBackend, ProfileBackend,
    RoleBackend, WishlistBackend,
};
use super::types::{
    AccessToken, ApplicantSummary, Application, ApplicationDetails, ApplicationWithContext,
    AuthSession, AuthUser, CartItem, CartItemUpsert, CustomerSummary, Internship,
    InternshipInput, InternshipTitle, NewApplication, NewWishlistItem, Order, OrderItem,
    OrderWithCustomer, OrderedProduct, Product, ProductInput, ProductQuery, ProductSummary,
    Profile, ProfileUpdate, SignUpOutcome, SignUpRequest, UserMetadata, UserRole, WishlistItem,
};
use super::{BackendError, BackendResult, INSUFFICIENT_PRIVILEGE, JWT_INVALID, UNIQUE_VIOLATION};

/// Access token lifetime handed out by the in-memory auth.
const TOKEN_LIFETIME_SECS: i64 = 3600;

struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

struct CartRow {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
}

struct WishlistRow {
    id: WishlistItemId,
    user_id: UserId,
    product_id: ProductId,
}

struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, UserId>,
    refresh_tokens: HashMap<String, UserId>,
    service_tokens: HashSet<String>,
    require_confirmation: bool,
    profiles: Vec<Profile>,
    roles: Vec<UserRole>,
    products: Vec<Product>,
    cart: Vec<CartRow>,
    wishlist: Vec<WishlistRow>,
    orders: Vec<Order>,
    order_items: Vec<OrderItemRow>,
    internships: Vec<Internship>,
    applications: Vec<Application>,
}

/// Who a token belongs to.
#[derive(Clone, Copy)]
enum Caller {
    Service,
    User(UserId),
}

impl MemoryState {
    fn resolve(&self, token: &AccessToken) -> BackendResult<Caller> {
        let raw = token.expose();
        if self.service_tokens.contains(raw) {
            return Ok(Caller::Service);
        }
        self.access_tokens
            .get(raw)
            .copied()
            .map(Caller::User)
            .ok_or_else(|| BackendError::api(401, Some(JWT_INVALID), "JWT expired"))
    }

    fn resolve_optional(&self, token: Option<&AccessToken>) -> BackendResult<Option<Caller>> {
        token.map(|t| self.resolve(t)).transpose()
    }

    fn has_role(&self, user_id: UserId, role: AppRole) -> bool {
        self.roles
            .iter()
            .any(|r| r.user_id == user_id && r.role == role)
    }

    fn is_admin(&self, caller: Caller) -> bool {
        match caller {
            Caller::Service => true,
            Caller::User(id) => self.has_role(id, AppRole::Admin),
        }
    }

    /// Owner or admin: the usual RLS policy shape.
    fn can_access(&self, caller: Caller, owner: UserId) -> bool {
        match caller {
            Caller::User(id) if id == owner => true,
            other => self.is_admin(other),
        }
    }

    fn issue_session(&mut self, user: AuthUser) -> AuthSession {
        let access_token = format!("mem-access-{}", uuid::Uuid::new_v4());
        let refresh_token = format!("mem-refresh-{}", uuid::Uuid::new_v4());
        self.access_tokens.insert(access_token.clone(), user.id);
        self.refresh_tokens.insert(refresh_token.clone(), user.id);
        AuthSession {
            access_token,
            refresh_token,
            expires_in: TOKEN_LIFETIME_SECS,
            user,
        }
    }

    fn user_by_id(&self, id: UserId) -> Option<AuthUser> {
        self.accounts
            .values()
            .find(|a| a.user.id == id)
            .map(|a| a.user.clone())
    }

    fn product_summary(&self, id: ProductId) -> Option<ProductSummary> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .map(ProductSummary::from)
    }

    fn customer(&self, user_id: UserId) -> Option<CustomerSummary> {
        self.profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| CustomerSummary {
                email: p.email.clone(),
                full_name: p.full_name.clone(),
            })
    }

    fn product_visible(&self, caller: Option<Caller>, product: &Product) -> bool {
        product.status == ProductStatus::Active || caller.is_some_and(|c| self.is_admin(c))
    }
}

fn forbidden(table: &str) -> BackendError {
    BackendError::api(
        403,
        Some(INSUFFICIENT_PRIVILEGE),
        format!("new row violates row-level security policy for table \"{table}\""),
    )
}

fn duplicate(constraint: &str) -> BackendError {
    BackendError::api(
        409,
        Some(UNIQUE_VIOLATION),
        format!("duplicate key value violates unique constraint \"{constraint}\""),
    )
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Fault switches for exercising error paths.
#[derive(Debug, Default)]
struct Faults {
    reads: AtomicBool,
    writes: AtomicBool,
    role_checks: AtomicBool,
}

/// In-memory stand-in for the hosted backend.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    reads: Arc<AtomicUsize>,
    mutations: Arc<AtomicUsize>,
    faults: Arc<Faults>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("reads", &self.read_count())
            .field("mutations", &self.mutation_count())
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// An empty backend where sign-up signs the user in immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a reading call and apply the read fault switch.
    fn read(&self) -> BackendResult<MutexGuard<'_, MemoryState>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.faults.reads.load(Ordering::SeqCst) {
            return Err(BackendError::api(503, None, "simulated read outage"));
        }
        Ok(self.state())
    }

    /// Count a mutating call and apply the write fault switch.
    fn write(&self) -> BackendResult<MutexGuard<'_, MemoryState>> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if self.faults.writes.load(Ordering::SeqCst) {
            return Err(BackendError::api(503, None, "simulated write outage"));
        }
        Ok(self.state())
    }

    // =========================================================================
    // Test setup
    // =========================================================================

    /// Make sign-up return "confirmation required" instead of a session.
    pub fn require_email_confirmation(&self, required: bool) {
        self.state().require_confirmation = required;
    }

    /// Create a confirmed account with a profile row.
    pub fn register_user(&self, email: &str, password: &str, full_name: Option<&str>) -> UserId {
        let mut state = self.state();
        Self::create_account(&mut state, email, password, full_name, true)
    }

    fn create_account(
        state: &mut MemoryState,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        confirmed: bool,
    ) -> UserId {
        let id = UserId::random();
        let now = Utc::now();
        let user = AuthUser {
            id,
            email: Some(email.to_owned()),
            user_metadata: UserMetadata {
                full_name: full_name.map(str::to_owned),
            },
        };
        state.accounts.insert(
            email.to_ascii_lowercase(),
            Account {
                user,
                password: password.to_owned(),
                confirmed,
            },
        );
        state.profiles.push(Profile {
            id: ProfileId::random(),
            user_id: id,
            email: email.to_owned(),
            full_name: full_name.map(str::to_owned),
            phone: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Mark a pending account as confirmed.
    pub fn confirm_email(&self, email: &str) {
        if let Some(account) = self.state().accounts.get_mut(&email.to_ascii_lowercase()) {
            account.confirmed = true;
        }
    }

    /// A token that bypasses row level security, like the service role key.
    #[must_use]
    pub fn service_token(&self) -> AccessToken {
        let raw = format!("mem-service-{}", uuid::Uuid::new_v4());
        self.state().service_tokens.insert(raw.clone());
        AccessToken::new(raw)
    }

    /// Invalidate an access token, as if it had expired.
    pub fn expire_token(&self, token: &AccessToken) {
        self.state().access_tokens.remove(token.expose());
    }

    /// Grant a role without going through RLS.
    pub fn seed_role(&self, user_id: UserId, role: AppRole) {
        let mut state = self.state();
        if !state.has_role(user_id, role) {
            state.roles.push(UserRole {
                id: RoleId::random(),
                user_id,
                role,
            });
        }
    }

    /// Insert a product without going through RLS.
    pub fn seed_product(&self, input: ProductInput) -> Product {
        let now = Utc::now();
        let product = Product {
            id: ProductId::random(),
            name: input.name,
            description: input.description,
            price: input.price,
            compare_price: input.compare_price,
            sku: input.sku,
            stock_quantity: input.stock_quantity,
            images: input.images,
            category: input.category,
            tags: input.tags,
            status: input.status,
            featured: input.featured,
            created_at: now,
            updated_at: now,
        };
        self.state().products.push(product.clone());
        product
    }

    /// Insert an order without going through RLS.
    pub fn seed_order(&self, user_id: UserId, total: Decimal, status: OrderStatus) -> Order {
        let mut state = self.state();
        let order = Order {
            id: OrderId::random(),
            user_id,
            order_number: format!("PW-{:05}", state.orders.len() + 1),
            status,
            total_amount: total,
            shipping_address: None,
            payment_method: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.orders.push(order.clone());
        order
    }

    /// Insert an order line without going through RLS.
    pub fn seed_order_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
        price: Decimal,
    ) {
        self.state().order_items.push(OrderItemRow {
            id: OrderItemId::random(),
            order_id,
            product_id,
            quantity,
            price,
        });
    }

    /// Insert an internship without going through RLS.
    pub fn seed_internship(&self, input: InternshipInput) -> Internship {
        let internship = internship_from_input(InternshipId::random(), input, 0);
        self.state().internships.push(internship.clone());
        internship
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    /// Number of reading calls received, including refused ones.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of mutating calls received, including refused ones.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// `(product, quantity)` rows in a user's cart.
    #[must_use]
    pub fn cart_rows(&self, user_id: UserId) -> Vec<(ProductId, i32)> {
        self.state()
            .cart
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| (row.product_id, row.quantity))
            .collect()
    }

    /// Products in a user's wishlist.
    #[must_use]
    pub fn wishlist_rows(&self, user_id: UserId) -> Vec<ProductId> {
        self.state()
            .wishlist
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.product_id)
            .collect()
    }

    /// Applications stored for a user.
    #[must_use]
    pub fn applications_of(&self, user_id: UserId) -> Vec<Application> {
        self.state()
            .applications
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    // =========================================================================
    // Faults
    // =========================================================================

    /// Make every read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail (the attempt is still counted).
    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    /// Make `has_role` and `get_user_roles` fail.
    pub fn fail_role_checks(&self, fail: bool) {
        self.faults.role_checks.store(fail, Ordering::SeqCst);
    }
}

fn internship_from_input(id: InternshipId, input: InternshipInput, current: i32) -> Internship {
    Internship {
        id,
        title: input.title,
        description: input.description,
        requirements: input.requirements,
        responsibilities: input.responsibilities,
        duration: input.duration,
        location: input.location,
        kind: input.kind,
        department: input.department,
        salary_range: input.salary_range,
        benefits: input.benefits,
        status: input.status,
        max_applications: input.max_applications,
        current_applications: current,
        start_date: input.start_date,
        end_date: input.end_date,
        created_at: Utc::now(),
        updated_at: None,
    }
}

// =============================================================================
// Auth & roles
// =============================================================================

impl AuthBackend for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let mut state = self.read()?;
        let (user, confirmed) = match state.accounts.get(&email.as_str().to_ascii_lowercase()) {
            Some(account) if account.password == password => {
                (account.user.clone(), account.confirmed)
            }
            _ => {
                return Err(BackendError::api(
                    400,
                    Some("invalid_credentials"),
                    "Invalid login credentials",
                ));
            }
        };
        if !confirmed {
            return Err(BackendError::api(
                400,
                Some("email_not_confirmed"),
                "Email not confirmed",
            ));
        }
        Ok(state.issue_session(user))
    }

    async fn sign_up(&self, request: &SignUpRequest) -> BackendResult<SignUpOutcome> {
        let mut state = self.write()?;
        if state
            .accounts
            .contains_key(&request.email.to_ascii_lowercase())
        {
            return Err(BackendError::api(
                422,
                Some("user_already_exists"),
                "User already registered",
            ));
        }
        let confirmed = !state.require_confirmation;
        let id = Self::create_account(
            &mut state,
            &request.email,
            &request.password,
            request.full_name.as_deref(),
            confirmed,
        );
        let user = state
            .user_by_id(id)
            .ok_or_else(|| BackendError::NotFound("new user".to_owned()))?;
        Ok(if confirmed {
            SignUpOutcome::SignedIn(state.issue_session(user))
        } else {
            SignUpOutcome::ConfirmationRequired(user)
        })
    }

    async fn sign_out(&self, caller: &AccessToken) -> BackendResult<()> {
        let mut state = self.state();
        if let Caller::User(id) = state.resolve(caller)? {
            state.access_tokens.retain(|_, user| *user != id);
            state.refresh_tokens.retain(|_, user| *user != id);
        }
        Ok(())
    }

    async fn get_user(&self, caller: &AccessToken) -> BackendResult<AuthUser> {
        let state = self.read()?;
        match state.resolve(caller)? {
            Caller::User(id) => state
                .user_by_id(id)
                .ok_or_else(|| BackendError::NotFound("user".to_owned())),
            Caller::Service => Err(BackendError::api(403, None, "service token has no user")),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> BackendResult<AuthSession> {
        let mut state = self.read()?;
        let user = state
            .refresh_tokens
            .remove(refresh_token)
            .and_then(|id| state.user_by_id(id))
            .ok_or_else(|| {
                BackendError::api(400, Some("invalid_grant"), "Invalid Refresh Token")
            })?;
        Ok(state.issue_session(user))
    }
}

impl RoleBackend for MemoryBackend {
    async fn has_role(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        role: AppRole,
    ) -> BackendResult<bool> {
        if self.faults.role_checks.load(Ordering::SeqCst) {
            return Err(BackendError::api(500, None, "simulated role check failure"));
        }
        let state = self.read()?;
        state.resolve(caller)?;
        Ok(state.has_role(user_id, role))
    }

    async fn get_user_roles(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Vec<AppRole>> {
        if self.faults.role_checks.load(Ordering::SeqCst) {
            return Err(BackendError::api(500, None, "simulated role check failure"));
        }
        let state = self.read()?;
        state.resolve(caller)?;
        Ok(state
            .roles
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.role)
            .collect())
    }

    async fn grant_role(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        role: AppRole,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !state.is_admin(caller) {
            return Err(forbidden("user_roles"));
        }
        if state.has_role(user_id, role) {
            return Err(duplicate("user_roles_user_id_role_key"));
        }
        state.roles.push(UserRole {
            id: RoleId::random(),
            user_id,
            role,
        });
        Ok(())
    }

    async fn revoke_role(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        role: AppRole,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if state.is_admin(caller) {
            state
                .roles
                .retain(|r| !(r.user_id == user_id && r.role == role));
        }
        Ok(())
    }

    async fn assign_admin_by_email(
        &self,
        caller: &AccessToken,
        email: &Email,
    ) -> BackendResult<bool> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !state.is_admin(caller) {
            return Err(forbidden("user_roles"));
        }
        let Some(user_id) = state
            .profiles
            .iter()
            .find(|p| p.email.eq_ignore_ascii_case(email.as_str()))
            .map(|p| p.user_id)
        else {
            return Ok(false);
        };
        if !state.has_role(user_id, AppRole::Admin) {
            state.roles.push(UserRole {
                id: RoleId::random(),
                user_id,
                role: AppRole::Admin,
            });
        }
        Ok(true)
    }
}

// =============================================================================
// Profiles
// =============================================================================

impl ProfileBackend for MemoryBackend {
    async fn list_profiles(&self, caller: &AccessToken) -> BackendResult<Vec<Profile>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .profiles
            .iter()
            .rev()
            .filter(|p| state.can_access(caller, p.user_id))
            .cloned()
            .collect())
    }

    async fn get_profile(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Option<Profile>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .profiles
            .iter()
            .find(|p| p.user_id == user_id && state.can_access(caller, p.user_id))
            .cloned())
    }

    async fn find_profile_by_email(
        &self,
        caller: &AccessToken,
        email: &Email,
    ) -> BackendResult<Option<Profile>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .profiles
            .iter()
            .find(|p| {
                p.email.eq_ignore_ascii_case(email.as_str()) && state.can_access(caller, p.user_id)
            })
            .cloned())
    }

    async fn update_profile(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !state.can_access(caller, user_id) {
            return Ok(());
        }
        if let Some(profile) = state.profiles.iter_mut().find(|p| p.user_id == user_id) {
            profile.full_name.clone_from(&update.full_name);
            profile.phone.clone_from(&update.phone);
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn count_profiles(&self, caller: &AccessToken) -> BackendResult<u64> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(count(
            state
                .profiles
                .iter()
                .filter(|p| state.can_access(caller, p.user_id))
                .count(),
        ))
    }
}

// =============================================================================
// Products
// =============================================================================

impl CatalogBackend for MemoryBackend {
    async fn list_products(
        &self,
        caller: Option<&AccessToken>,
        query: ProductQuery,
    ) -> BackendResult<Vec<Product>> {
        let state = self.read()?;
        let caller = state.resolve_optional(caller)?;
        let rows = state
            .products
            .iter()
            .rev()
            .filter(|p| state.product_visible(caller, p))
            .filter(|p| !query.active_only || p.status == ProductStatus::Active)
            .filter(|p| !query.featured_only || p.featured)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn get_product(
        &self,
        caller: Option<&AccessToken>,
        id: ProductId,
        active_only: bool,
    ) -> BackendResult<Option<Product>> {
        let state = self.read()?;
        let caller = state.resolve_optional(caller)?;
        Ok(state
            .products
            .iter()
            .find(|p| p.id == id)
            .filter(|p| state.product_visible(caller, p))
            .filter(|p| !active_only || p.status == ProductStatus::Active)
            .cloned())
    }

    async fn create_product(
        &self,
        caller: &AccessToken,
        input: &ProductInput,
    ) -> BackendResult<Product> {
        {
            let state = self.write()?;
            let caller = state.resolve(caller)?;
            if !state.is_admin(caller) {
                return Err(forbidden("products"));
            }
        }
        Ok(self.seed_product(input.clone()))
    }

    async fn update_product(
        &self,
        caller: &AccessToken,
        id: ProductId,
        input: &ProductInput,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !state.is_admin(caller) {
            return Ok(());
        }
        if let Some(product) = state.products.iter_mut().find(|p| p.id == id) {
            let input = input.clone();
            product.name = input.name;
            product.description = input.description;
            product.price = input.price;
            product.compare_price = input.compare_price;
            product.sku = input.sku;
            product.stock_quantity = input.stock_quantity;
            product.images = input.images;
            product.category = input.category;
            product.tags = input.tags;
            product.status = input.status;
            product.featured = input.featured;
            product.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_product(&self, caller: &AccessToken, id: ProductId) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if state.is_admin(caller) {
            state.products.retain(|p| p.id != id);
            state.cart.retain(|row| row.product_id != id);
            state.wishlist.retain(|row| row.product_id != id);
        }
        Ok(())
    }

    async fn count_products(&self, caller: &AccessToken) -> BackendResult<u64> {
        let state = self.read()?;
        let caller = Some(state.resolve(caller)?);
        Ok(count(
            state
                .products
                .iter()
                .filter(|p| state.product_visible(caller, p))
                .count(),
        ))
    }
}

// =============================================================================
// Cart
// =============================================================================

impl CartBackend for MemoryBackend {
    async fn list_cart_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Vec<CartItem>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .cart
            .iter()
            .filter(|row| row.user_id == user_id && state.can_access(caller, row.user_id))
            .map(|row| CartItem {
                id: row.id,
                product_id: row.product_id,
                quantity: row.quantity,
                product: state.product_summary(row.product_id),
            })
            .collect())
    }

    async fn upsert_cart_item(
        &self,
        caller: &AccessToken,
        item: &CartItemUpsert,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !matches!(caller, Caller::User(id) if id == item.user_id) {
            return Err(forbidden("cart_items"));
        }
        if let Some(row) = state
            .cart
            .iter_mut()
            .find(|row| row.user_id == item.user_id && row.product_id == item.product_id)
        {
            row.quantity = item.quantity;
        } else {
            state.cart.push(CartRow {
                id: CartItemId::random(),
                user_id: item.user_id,
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }
        Ok(())
    }

    async fn set_cart_item_quantity(
        &self,
        caller: &AccessToken,
        item_id: CartItemId,
        quantity: i32,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        let allowed = state
            .cart
            .iter()
            .find(|row| row.id == item_id)
            .is_some_and(|row| state.can_access(caller, row.user_id));
        if allowed && let Some(row) = state.cart.iter_mut().find(|row| row.id == item_id) {
            row.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_cart_item(&self, caller: &AccessToken, item_id: CartItemId) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        let allowed: Vec<CartItemId> = state
            .cart
            .iter()
            .filter(|row| row.id == item_id && state.can_access(caller, row.user_id))
            .map(|row| row.id)
            .collect();
        state.cart.retain(|row| !allowed.contains(&row.id));
        Ok(())
    }

    async fn clear_cart(&self, caller: &AccessToken, user_id: UserId) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if state.can_access(caller, user_id) {
            state.cart.retain(|row| row.user_id != user_id);
        }
        Ok(())
    }

    async fn count_cart_items(&self, caller: &AccessToken, user_id: UserId) -> BackendResult<u64> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        if !state.can_access(caller, user_id) {
            return Ok(0);
        }
        Ok(count(
            state.cart.iter().filter(|row| row.user_id == user_id).count(),
        ))
    }
}

// =============================================================================
// Wishlist
// =============================================================================

impl WishlistBackend for MemoryBackend {
    async fn list_wishlist_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Vec<WishlistItem>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .wishlist
            .iter()
            .rev()
            .filter(|row| row.user_id == user_id && state.can_access(caller, row.user_id))
            .map(|row| WishlistItem {
                id: row.id,
                product_id: row.product_id,
                product: state.product_summary(row.product_id),
            })
            .collect())
    }

    async fn insert_wishlist_item(
        &self,
        caller: &AccessToken,
        item: &NewWishlistItem,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !matches!(caller, Caller::User(id) if id == item.user_id) {
            return Err(forbidden("wishlist_items"));
        }
        if state
            .wishlist
            .iter()
            .any(|row| row.user_id == item.user_id && row.product_id == item.product_id)
        {
            return Err(duplicate("wishlist_items_user_id_product_id_key"));
        }
        state.wishlist.push(WishlistRow {
            id: WishlistItemId::random(),
            user_id: item.user_id,
            product_id: item.product_id,
        });
        Ok(())
    }

    async fn delete_wishlist_item(
        &self,
        caller: &AccessToken,
        item_id: WishlistItemId,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        let allowed: Vec<WishlistItemId> = state
            .wishlist
            .iter()
            .filter(|row| row.id == item_id && state.can_access(caller, row.user_id))
            .map(|row| row.id)
            .collect();
        state.wishlist.retain(|row| !allowed.contains(&row.id));
        Ok(())
    }

    async fn count_wishlist_items(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<u64> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        if !state.can_access(caller, user_id) {
            return Ok(0);
        }
        Ok(count(
            state
                .wishlist
                .iter()
                .filter(|row| row.user_id == user_id)
                .count(),
        ))
    }
}

// =============================================================================
// Orders
// =============================================================================

impl OrderBackend for MemoryBackend {
    async fn list_orders(&self, caller: &AccessToken) -> BackendResult<Vec<OrderWithCustomer>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| state.can_access(caller, o.user_id))
            .map(|o| OrderWithCustomer {
                order: o.clone(),
                customer: state.customer(o.user_id),
            })
            .collect())
    }

    async fn list_orders_for_user(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Vec<Order>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id && state.can_access(caller, o.user_id))
            .cloned()
            .collect())
    }

    async fn get_order(
        &self,
        caller: &AccessToken,
        id: OrderId,
    ) -> BackendResult<Option<OrderWithCustomer>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == id && state.can_access(caller, o.user_id))
            .map(|o| OrderWithCustomer {
                order: o.clone(),
                customer: state.customer(o.user_id),
            }))
    }

    async fn list_order_items(
        &self,
        caller: &AccessToken,
        order_id: OrderId,
    ) -> BackendResult<Vec<OrderItem>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        let visible = state
            .orders
            .iter()
            .any(|o| o.id == order_id && state.can_access(caller, o.user_id));
        if !visible {
            return Ok(Vec::new());
        }
        Ok(state
            .order_items
            .iter()
            .filter(|row| row.order_id == order_id)
            .map(|row| OrderItem {
                id: row.id,
                order_id: row.order_id,
                product_id: row.product_id,
                quantity: row.quantity,
                price: row.price,
                product: state
                    .products
                    .iter()
                    .find(|p| p.id == row.product_id)
                    .map(|p| OrderedProduct {
                        name: p.name.clone(),
                        images: p.images.clone(),
                    }),
            })
            .collect())
    }

    async fn update_order_status(
        &self,
        caller: &AccessToken,
        id: OrderId,
        status: OrderStatus,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !state.is_admin(caller) {
            return Ok(());
        }
        if let Some(order) = state.orders.iter_mut().find(|o| o.id == id) {
            order.status = status;
            order.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn count_orders(
        &self,
        caller: &AccessToken,
        status: Option<OrderStatus>,
    ) -> BackendResult<u64> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(count(
            state
                .orders
                .iter()
                .filter(|o| state.can_access(caller, o.user_id))
                .filter(|o| status.is_none_or(|s| o.status == s))
                .count(),
        ))
    }
}

// =============================================================================
// Internships & applications
// =============================================================================

impl InternshipBackend for MemoryBackend {
    async fn list_internships(
        &self,
        caller: Option<&AccessToken>,
        open_only: bool,
    ) -> BackendResult<Vec<Internship>> {
        let state = self.read()?;
        state.resolve_optional(caller)?;
        Ok(state
            .internships
            .iter()
            .rev()
            .filter(|i| !open_only || i.status.accepts_applications())
            .cloned()
            .collect())
    }

    async fn get_internship(
        &self,
        caller: Option<&AccessToken>,
        id: InternshipId,
    ) -> BackendResult<Option<Internship>> {
        let state = self.read()?;
        state.resolve_optional(caller)?;
        Ok(state.internships.iter().find(|i| i.id == id).cloned())
    }

    async fn create_internship(
        &self,
        caller: &AccessToken,
        input: &InternshipInput,
    ) -> BackendResult<Internship> {
        {
            let state = self.write()?;
            let caller = state.resolve(caller)?;
            if !state.is_admin(caller) {
                return Err(forbidden("internships"));
            }
        }
        Ok(self.seed_internship(input.clone()))
    }

    async fn update_internship(
        &self,
        caller: &AccessToken,
        id: InternshipId,
        input: &InternshipInput,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !state.is_admin(caller) {
            return Ok(());
        }
        if let Some(existing) = state.internships.iter_mut().find(|i| i.id == id) {
            let created_at = existing.created_at;
            let mut updated =
                internship_from_input(id, input.clone(), existing.current_applications);
            updated.created_at = created_at;
            updated.updated_at = Some(Utc::now());
            *existing = updated;
        }
        Ok(())
    }

    async fn delete_internship(&self, caller: &AccessToken, id: InternshipId) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if state.is_admin(caller) {
            state.internships.retain(|i| i.id != id);
            state.applications.retain(|a| a.internship_id != id);
        }
        Ok(())
    }

    async fn list_applications(
        &self,
        caller: &AccessToken,
    ) -> BackendResult<Vec<ApplicationWithContext>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .applications
            .iter()
            .rev()
            .filter(|a| state.can_access(caller, a.user_id))
            .map(|a| ApplicationWithContext {
                application: a.clone(),
                applicant: state.customer(a.user_id).map(|c| ApplicantSummary {
                    full_name: c.full_name,
                    email: c.email,
                }),
                internship: state
                    .internships
                    .iter()
                    .find(|i| i.id == a.internship_id)
                    .map(|i| InternshipTitle {
                        title: i.title.clone(),
                    }),
            })
            .collect())
    }

    async fn find_application(
        &self,
        caller: &AccessToken,
        internship_id: InternshipId,
        user_id: UserId,
    ) -> BackendResult<Option<Application>> {
        let state = self.read()?;
        let caller = state.resolve(caller)?;
        Ok(state
            .applications
            .iter()
            .find(|a| {
                a.internship_id == internship_id
                    && a.user_id == user_id
                    && state.can_access(caller, a.user_id)
            })
            .cloned())
    }

    async fn create_application(
        &self,
        caller: &AccessToken,
        application: &NewApplication,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !matches!(caller, Caller::User(id) if id == application.user_id) {
            return Err(forbidden("internship_applications"));
        }
        if state.applications.iter().any(|a| {
            a.internship_id == application.internship_id && a.user_id == application.user_id
        }) {
            return Err(duplicate(
                "internship_applications_internship_id_user_id_key",
            ));
        }
        state.applications.push(Application {
            id: ApplicationId::random(),
            internship_id: application.internship_id,
            user_id: application.user_id,
            status: application.status,
            details: application.details.clone(),
            admin_notes: None,
            created_at: Utc::now(),
            updated_at: None,
        });
        // Counter trigger
        if let Some(internship) = state
            .internships
            .iter_mut()
            .find(|i| i.id == application.internship_id)
        {
            internship.current_applications += 1;
        }
        Ok(())
    }

    async fn update_application(
        &self,
        caller: &AccessToken,
        internship_id: InternshipId,
        user_id: UserId,
        details: &ApplicationDetails,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !state.can_access(caller, user_id) {
            return Ok(());
        }
        if let Some(application) = state
            .applications
            .iter_mut()
            .find(|a| a.internship_id == internship_id && a.user_id == user_id)
        {
            application.details = details.clone();
            application.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn update_application_status(
        &self,
        caller: &AccessToken,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !state.is_admin(caller) {
            return Ok(());
        }
        if let Some(application) = state.applications.iter_mut().find(|a| a.id == id) {
            application.status = status;
            application.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn update_application_notes(
        &self,
        caller: &AccessToken,
        id: ApplicationId,
        admin_notes: Option<&str>,
    ) -> BackendResult<()> {
        let mut state = self.write()?;
        let caller = state.resolve(caller)?;
        if !state.is_admin(caller) {
            return Ok(());
        }
        if let Some(application) = state.applications.iter_mut().find(|a| a.id == id) {
            application.admin_notes = admin_notes.map(str::to_owned);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn widget(status: ProductStatus) -> ProductInput {
        ProductInput {
            name: "Smoke Detector".to_owned(),
            description: None,
            price: Decimal::new(10, 0),
            compare_price: None,
            sku: None,
            stock_quantity: 5,
            images: Vec::new(),
            category: None,
            tags: Vec::new(),
            status,
            featured: false,
        }
    }

    async fn signed_in(backend: &MemoryBackend, email: &str) -> AuthSession {
        backend.register_user(email, "hunter22", None);
        backend
            .sign_in_with_password(&Email::parse(email).unwrap(), "hunter22")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_rejects_wrong_password() {
        let backend = MemoryBackend::new();
        backend.register_user("a@example.com", "right-pass", None);

        let err = backend
            .sign_in_with_password(&Email::parse("a@example.com").unwrap(), "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("invalid_credentials"));
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let backend = MemoryBackend::new();
        let err = backend
            .list_cart_items(&AccessToken::new("forged"), UserId::random())
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_cart_upsert_overwrites_quantity() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend, "u@example.com").await;
        let product = backend.seed_product(widget(ProductStatus::Active));
        let token = session.access_token();
        let item = |quantity| CartItemUpsert {
            user_id: session.user.id,
            product_id: product.id,
            quantity,
        };

        backend.upsert_cart_item(&token, &item(1)).await.unwrap();
        backend.upsert_cart_item(&token, &item(4)).await.unwrap();

        assert_eq!(backend.cart_rows(session.user.id), vec![(product.id, 4)]);
        assert_eq!(backend.mutation_count(), 2);
    }

    #[tokio::test]
    async fn test_cart_insert_for_other_user_is_forbidden() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend, "u@example.com").await;
        let product = backend.seed_product(widget(ProductStatus::Active));

        let err = backend
            .upsert_cart_item(
                &session.access_token(),
                &CartItemUpsert {
                    user_id: UserId::random(),
                    product_id: product.id,
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_wishlist_duplicate_is_unique_violation() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend, "u@example.com").await;
        let product = backend.seed_product(widget(ProductStatus::Active));
        let item = NewWishlistItem {
            user_id: session.user.id,
            product_id: product.id,
        };

        backend
            .insert_wishlist_item(&session.access_token(), &item)
            .await
            .unwrap();
        let err = backend
            .insert_wishlist_item(&session.access_token(), &item)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(backend.wishlist_rows(session.user.id).len(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_catalog_hides_inactive() {
        let backend = MemoryBackend::new();
        backend.seed_product(widget(ProductStatus::Active));
        let hidden = backend.seed_product(widget(ProductStatus::Inactive));

        let products = backend
            .list_products(None, ProductQuery::all())
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert!(
            backend
                .get_product(None, hidden.id, false)
                .await
                .unwrap()
                .is_none()
        );

        let service = backend.service_token();
        let all = backend
            .list_products(Some(&service), ProductQuery::all())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend, "u@example.com").await;

        let refreshed = backend
            .refresh_session(&session.refresh_token)
            .await
            .unwrap();
        assert_ne!(refreshed.access_token, session.access_token);
        assert!(backend.refresh_session(&session.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_application_insert_bumps_counter() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend, "intern@example.com").await;
        let internship = backend.seed_internship(InternshipInput {
            title: "Firmware".to_owned(),
            description: "Detector firmware".to_owned(),
            requirements: Vec::new(),
            responsibilities: Vec::new(),
            duration: "3 months".to_owned(),
            location: "Remote".to_owned(),
            kind: "remote".to_owned(),
            department: "Engineering".to_owned(),
            salary_range: None,
            benefits: Vec::new(),
            status: pyrowarden_core::InternshipStatus::Open,
            max_applications: Some(10),
            start_date: None,
            end_date: None,
        });

        backend
            .create_application(
                &session.access_token(),
                &NewApplication {
                    internship_id: internship.id,
                    user_id: session.user.id,
                    status: ApplicationStatus::Pending,
                    details: ApplicationDetails::default(),
                },
            )
            .await
            .unwrap();

        let reloaded = backend
            .get_internship(None, internship.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.current_applications, 1);
    }
}
