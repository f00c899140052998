//! Cart flows over HTTP against the in-memory backend.

use pyrowarden_integration_tests::TestSite;
use rust_decimal::Decimal;

#[tokio::test]
async fn test_add_update_to_zero_removes_line() {
    let mut site = TestSite::new();
    let user = site.customer("ada@example.com", "Ada");
    let product = site.product("Flame Sensor", Decimal::new(10, 0), 5);
    site.sign_in("ada@example.com").await;

    let response = site
        .post(
            "/cart/add",
            &[
                ("product_id", &product.id.to_string()),
                ("quantity", "3"),
                ("next", "/cart"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/cart");

    let page = site.get("/cart").await;
    assert!(page.body.contains("Added to cart"));
    assert!(page.body.contains("Total: $30.00"), "{}", page.body);
    assert_eq!(site.backend.cart_rows(user), vec![(product.id, 3)]);

    let item_id = page.input_value("item_id").unwrap().to_owned();
    let response = site
        .post("/cart/update", &[("item_id", &item_id), ("quantity", "0")])
        .await;
    assert_eq!(response.redirect_target(), "/cart");

    let page = site.get("/cart").await;
    assert!(page.body.contains("Your cart is empty"));
    assert!(site.backend.cart_rows(user).is_empty());
}

#[tokio::test]
async fn test_blank_quantity_keeps_line() {
    let mut site = TestSite::new();
    let user = site.customer("ada@example.com", "Ada");
    let product = site.product("Flame Sensor", Decimal::new(10, 0), 5);
    site.sign_in("ada@example.com").await;

    site.post("/cart/add", &[("product_id", &product.id.to_string()), ("quantity", "2")])
        .await;
    let page = site.get("/cart").await;
    let item_id = page.input_value("item_id").unwrap().to_owned();

    let response = site
        .post("/cart/update", &[("item_id", &item_id), ("quantity", " ")])
        .await;
    assert_eq!(response.redirect_target(), "/cart");

    let page = site.get("/cart").await;
    assert!(page.body.contains("Quantity is required"));
    assert_eq!(site.backend.cart_rows(user), vec![(product.id, 2)]);
}

#[tokio::test]
async fn test_add_post_leaves_reading_to_cart_page() {
    let mut site = TestSite::new();
    let user = site.customer("ada@example.com", "Ada");
    let product = site.product("Flame Sensor", Decimal::new(10, 0), 5);
    site.sign_in("ada@example.com").await;

    let reads = site.backend.read_count();
    site.post("/cart/add", &[("product_id", &product.id.to_string()), ("quantity", "1")])
        .await;
    assert_eq!(site.backend.read_count(), reads);
    assert_eq!(site.backend.cart_rows(user), vec![(product.id, 1)]);
}

#[tokio::test]
async fn test_adding_twice_keeps_one_line() {
    let mut site = TestSite::new();
    let user = site.customer("ada@example.com", "Ada");
    let product = site.product("Smoke Detector", Decimal::new(2500, 2), 10);
    site.sign_in("ada@example.com").await;

    let id = product.id.to_string();
    site.post("/cart/add", &[("product_id", &id), ("quantity", "2")])
        .await;
    site.post("/cart/add", &[("product_id", &id), ("quantity", "4")])
        .await;

    // The second add overwrites the quantity.
    assert_eq!(site.backend.cart_rows(user), vec![(product.id, 4)]);
}

#[tokio::test]
async fn test_signed_out_add_touches_nothing() {
    let mut site = TestSite::new();
    let product = site.product("Extinguisher", Decimal::new(4999, 2), 3);
    let before = site.backend.mutation_count();

    let response = site
        .post(
            "/cart/add",
            &[("product_id", &product.id.to_string()), ("next", "/products")],
        )
        .await;
    assert_eq!(response.redirect_target(), "/products");
    assert_eq!(site.backend.mutation_count(), before);

    let page = site.get("/products").await;
    assert!(page.body.contains("You need to be signed in to add items to cart"));
}

#[tokio::test]
async fn test_offsite_next_is_ignored() {
    let mut site = TestSite::new();
    site.customer("ada@example.com", "Ada");
    let product = site.product("Heat Sensor", Decimal::new(15, 0), 2);
    site.sign_in("ada@example.com").await;

    let response = site
        .post(
            "/cart/add",
            &[
                ("product_id", &product.id.to_string()),
                ("next", "//evil.example.com/"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/");
}

#[tokio::test]
async fn test_checkout_is_disabled() {
    let mut site = TestSite::new();
    site.customer("ada@example.com", "Ada");
    let product = site.product("Fire Blanket", Decimal::new(20, 0), 8);
    site.sign_in("ada@example.com").await;
    site.post("/cart/add", &[("product_id", &product.id.to_string())])
        .await;

    let page = site.get("/cart").await;
    assert!(page.body.contains("disabled title=\"Checkout is coming soon\""));
    assert_eq!(site.get("/checkout").await.status, 404);
}
