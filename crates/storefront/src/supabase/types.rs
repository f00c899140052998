//! Row and payload types for the backend tables.
//!
//! Nullable array/boolean/counter columns are read through [`null_default`]
//! so a `null` in the database behaves like an empty list or zero.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use pyrowarden_core::{
    AppRole, ApplicationId, ApplicationStatus, CartItemId, InternshipId, InternshipStatus,
    OrderId, OrderItemId, OrderStatus, Price, ProductId, ProductStatus, ProfileId, RoleId, UserId,
    WishlistItemId,
};

/// Deserialize `null` as `T::default()`.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// PostgREST embeds a to-one relation as an object, but some relationship
/// shapes come back as a one-element array. Accept both.
fn embedded_one<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(
        match Option::<OneOrMany<T>>::deserialize(deserializer)? {
            Some(OneOrMany::One(value)) => Some(value),
            Some(OneOrMany::Many(values)) => values.into_iter().next(),
            None => None,
        },
    )
}

// =============================================================================
// Auth
// =============================================================================

/// A bearer token for backend requests.
///
/// Either a user's access token or a service role key. `Debug` never prints
/// the token.
#[derive(Debug, Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Metadata stored with the auth user at sign-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Full name entered on the sign-up form.
    #[serde(default)]
    pub full_name: Option<String>,
}

/// The authenticated user as returned by the auth API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    /// Auth user ID (also `profiles.user_id`).
    pub id: UserId,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Sign-up metadata.
    #[serde(default, deserialize_with = "null_default")]
    pub user_metadata: UserMetadata,
}

/// A signed-in session.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    /// Short-lived JWT sent with every request.
    pub access_token: String,
    /// Long-lived token for the refresh grant.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// The signed-in user.
    pub user: AuthUser,
}

impl AuthSession {
    /// The access token as a request credential.
    #[must_use]
    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(self.access_token.clone())
    }
}

/// Sign-up form payload.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    /// Email address.
    pub email: String,
    /// Plain password, sent once over TLS.
    pub password: String,
    /// Full name stored in user metadata.
    pub full_name: Option<String>,
    /// Where the confirmation email should send the user back to.
    pub redirect_to: Option<String>,
}

/// Result of a sign-up call.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Email confirmation is disabled; the user is signed in.
    SignedIn(AuthSession),
    /// A confirmation email was sent; no session yet.
    ConfirmationRequired(AuthUser),
}

// =============================================================================
// Profiles & roles
// =============================================================================

/// A row in `profiles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Name to show, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// A row in `user_roles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRole {
    pub id: RoleId,
    pub user_id: UserId,
    pub role: AppRole,
}

/// Insert payload for `user_roles`.
#[derive(Debug, Clone, Serialize)]
pub struct NewUserRole {
    pub user_id: UserId,
    pub role: AppRole,
}

// =============================================================================
// Catalog
// =============================================================================

/// A row in `products`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub compare_price: Option<Decimal>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub stock_quantity: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub status: ProductStatus,
    #[serde(default, deserialize_with = "null_default")]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price.
    #[must_use]
    pub fn price(&self) -> Price {
        Price::usd(self.price)
    }

    /// Strike-through price when it is above the selling price.
    #[must_use]
    pub fn compare_price(&self) -> Option<Price> {
        self.compare_price
            .filter(|compare| *compare > self.price)
            .map(Price::usd)
    }

    /// First image, used on cards and the cart.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether there is stock to add to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Whole-percent saving against the compare-at price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;

        let compare = self
            .compare_price
            .filter(|compare| *compare > self.price && *compare > Decimal::ZERO)?;
        ((compare - self.price) / compare * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
    }
}

/// Insert/update payload for `products`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub sku: Option<String>,
    pub stock_quantity: i32,
    pub images: Vec<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub featured: bool,
}

/// Product columns embedded in cart and wishlist rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub compare_price: Option<Decimal>,
    #[serde(default, deserialize_with = "null_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub stock_quantity: i32,
}

impl ProductSummary {
    /// Unit price.
    #[must_use]
    pub fn price(&self) -> Price {
        Price::usd(self.price)
    }
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            compare_price: product.compare_price,
            images: product.images.clone(),
            stock_quantity: product.stock_quantity,
        }
    }
}

/// Which products a catalog read should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Only `active` products (the public catalog).
    pub active_only: bool,
    /// Only featured products (home page).
    pub featured_only: bool,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl ProductQuery {
    /// Every product, for the admin table.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            active_only: false,
            featured_only: false,
            limit: None,
        }
    }

    /// The public catalog.
    #[must_use]
    pub const fn storefront() -> Self {
        Self {
            active_only: true,
            featured_only: false,
            limit: None,
        }
    }

    /// Featured products for the home page.
    #[must_use]
    pub const fn featured(limit: usize) -> Self {
        Self {
            active_only: true,
            featured_only: true,
            limit: Some(limit),
        }
    }
}

// =============================================================================
// Cart & wishlist
// =============================================================================

/// A row in `cart_items` joined with its product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    #[serde(default, deserialize_with = "embedded_one")]
    pub product: Option<ProductSummary>,
}

/// Upsert payload for `cart_items`, keyed on `(user_id, product_id)`.
impl CartItem {
    /// Unit price times quantity; zero when the product row is missing.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product
            .as_ref()
            .map_or_else(Price::zero, |product| product.price().times(self.quantity))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemUpsert {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A row in `wishlist_items` joined with its product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub product_id: ProductId,
    #[serde(default, deserialize_with = "embedded_one")]
    pub product: Option<ProductSummary>,
}

/// Insert payload for `wishlist_items`.
#[derive(Debug, Clone, Serialize)]
pub struct NewWishlistItem {
    pub user_id: UserId,
    pub product_id: ProductId,
}

// =============================================================================
// Orders
// =============================================================================

/// A row in `orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: OrderStatus,
    pub total_amount: Decimal,
    #[serde(default)]
    pub shipping_address: Option<serde_json::Value>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Order total.
    #[must_use]
    pub fn total(&self) -> Price {
        Price::usd(self.total_amount)
    }
}

/// Customer columns embedded in an admin order row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// An order with its customer, for the admin orders page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithCustomer {
    #[serde(flatten)]
    pub order: Order,
    #[serde(
        default,
        rename = "profiles",
        deserialize_with = "embedded_one"
    )]
    pub customer: Option<CustomerSummary>,
}

/// Product columns embedded in an order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedProduct {
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub images: Vec<String>,
}

/// A row in `order_items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
    #[serde(default, deserialize_with = "embedded_one")]
    pub product: Option<OrderedProduct>,
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price().times(self.quantity)
    }

    /// Price paid per unit.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }
}

// =============================================================================
// Internships
// =============================================================================

/// A row in `internships`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Internship {
    pub id: InternshipId,
    pub title: String,
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub requirements: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub responsibilities: Vec<String>,
    pub duration: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub department: String,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub benefits: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub status: InternshipStatus,
    #[serde(default)]
    pub max_applications: Option<i32>,
    #[serde(default, deserialize_with = "null_default")]
    pub current_applications: i32,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Internship {
    /// Whether the application counter has reached its cap.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.max_applications
            .is_some_and(|max| self.current_applications >= max)
    }

    /// Whether a new application would be accepted.
    #[must_use]
    pub fn accepts_new_applications(&self) -> bool {
        self.status.accepts_applications() && !self.is_full()
    }
}

/// Insert/update payload for `internships`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InternshipInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    pub duration: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub department: String,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub status: InternshipStatus,
    #[serde(default)]
    pub max_applications: Option<i32>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// A row in `internship_applications`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub internship_id: InternshipId,
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_default")]
    pub status: ApplicationStatus,
    #[serde(flatten)]
    pub details: ApplicationDetails,
    #[serde(default)]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The applicant-editable part of an application.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationDetails {
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub expected_graduation_date: Option<NaiveDate>,
    #[serde(default)]
    pub current_education: Option<String>,
    #[serde(default)]
    pub relevant_experience: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub skills: Vec<String>,
    #[serde(default)]
    pub availability_start: Option<NaiveDate>,
    #[serde(default)]
    pub availability_end: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Insert payload for a new application.
#[derive(Debug, Clone, Serialize)]
pub struct NewApplication {
    pub internship_id: InternshipId,
    pub user_id: UserId,
    pub status: ApplicationStatus,
    #[serde(flatten)]
    pub details: ApplicationDetails,
}

/// Applicant columns embedded in the admin applications list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantSummary {
    #[serde(default)]
    pub full_name: Option<String>,
    pub email: String,
}

/// Internship columns embedded in the admin applications list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternshipTitle {
    pub title: String,
}

/// An application with applicant and internship, for the admin page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationWithContext {
    #[serde(flatten)]
    pub application: Application,
    #[serde(default, rename = "user_profile", deserialize_with = "embedded_one")]
    pub applicant: Option<ApplicantSummary>,
    #[serde(default, deserialize_with = "embedded_one")]
    pub internship: Option<InternshipTitle>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_nulls_become_defaults() {
        let json = r#"{
            "id": "7d9f8a4e-0c1b-4f5e-9a2d-3b4c5d6e7f80",
            "name": "Flame Sensor",
            "description": null,
            "price": 49.99,
            "compare_price": 59.99,
            "sku": null,
            "stock_quantity": null,
            "images": null,
            "category": "Sensors",
            "tags": null,
            "status": null,
            "featured": null,
            "created_at": "2024-03-01T10:00:00+00:00",
            "updated_at": "2024-03-01T10:00:00+00:00"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.stock_quantity, 0);
        assert!(product.images.is_empty());
        assert_eq!(product.status, ProductStatus::Active);
        assert!(!product.featured);
        assert_eq!(product.price().display(), "$49.99");
        assert_eq!(product.compare_price().unwrap().display(), "$59.99");
        assert_eq!(product.discount_percent(), Some(17));
        assert!(!product.in_stock());
    }

    #[test]
    fn test_cart_item_embedded_product() {
        let json = r#"{
            "id": "0b6e1f0a-5c0d-4d3e-8f9a-1b2c3d4e5f60",
            "product_id": "7d9f8a4e-0c1b-4f5e-9a2d-3b4c5d6e7f80",
            "quantity": 3,
            "product": {
                "id": "7d9f8a4e-0c1b-4f5e-9a2d-3b4c5d6e7f80",
                "name": "Flame Sensor",
                "price": 10,
                "images": ["https://cdn.example.com/a.png"],
                "stock_quantity": 5
            }
        }"#;
        let item: CartItem = serde_json::from_str(json).unwrap();
        let product = item.product.unwrap();
        assert_eq!(product.price().times(item.quantity).display(), "$30.00");
    }

    #[test]
    fn test_order_customer_accepts_array_embed() {
        let json = r#"{
            "id": "1e2d3c4b-5a69-4788-8f9e-0a1b2c3d4e5f",
            "user_id": "2f3e4d5c-6b7a-4899-9a0b-1c2d3e4f5a6b",
            "order_number": "PW-1001",
            "status": "shipped",
            "total_amount": "120.50",
            "created_at": "2024-05-02T08:30:00+00:00",
            "profiles": [{"email": "buyer@example.com", "full_name": "Ada"}]
        }"#;
        let row: OrderWithCustomer = serde_json::from_str(json).unwrap();
        assert_eq!(row.order.status, OrderStatus::Shipped);
        assert_eq!(row.customer.unwrap().email, "buyer@example.com");
        assert_eq!(row.order.total().display(), "$120.50");
    }

    #[test]
    fn test_internship_capacity() {
        let json = r#"{
            "id": "3a4b5c6d-7e8f-4a0b-9c1d-2e3f4a5b6c7d",
            "title": "Embedded Firmware Intern",
            "description": "Work on detector firmware",
            "requirements": ["C"],
            "responsibilities": null,
            "duration": "3 months",
            "location": "Remote",
            "type": "remote",
            "department": "Engineering",
            "benefits": null,
            "status": "open",
            "max_applications": 2,
            "current_applications": 2,
            "created_at": "2024-01-10T00:00:00+00:00"
        }"#;
        let internship: Internship = serde_json::from_str(json).unwrap();
        assert_eq!(internship.kind, "remote");
        assert!(internship.is_full());
        assert!(!internship.accepts_new_applications());
    }

    #[test]
    fn test_application_details_flatten() {
        let json = r#"{
            "id": "4b5c6d7e-8f9a-4b1c-8d2e-3f4a5b6c7d8e",
            "internship_id": "3a4b5c6d-7e8f-4a0b-9c1d-2e3f4a5b6c7d",
            "user_id": "2f3e4d5c-6b7a-4899-9a0b-1c2d3e4f5a6b",
            "status": "shortlisted",
            "cover_letter": "Hello",
            "skills": ["Rust", "C"],
            "expected_graduation_date": "2026-06-01",
            "created_at": "2024-02-01T00:00:00+00:00"
        }"#;
        let application: Application = serde_json::from_str(json).unwrap();
        assert_eq!(application.status, ApplicationStatus::Shortlisted);
        assert_eq!(application.details.skills, vec!["Rust", "C"]);
        assert!(application.details.resume_url.is_none());
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJ-very-secret");
        assert!(!format!("{token:?}").contains("very-secret"));
        assert_eq!(token.expose(), "eyJ-very-secret");
    }
}
