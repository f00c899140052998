//! Wishlist flows.

use pyrowarden_integration_tests::TestSite;
use rust_decimal::Decimal;

#[tokio::test]
async fn test_duplicate_add_is_soft() {
    let mut site = TestSite::new();
    let user = site.customer("ada@example.com", "Ada");
    let product = site.product("Flame Sensor", Decimal::new(10, 0), 5);
    site.sign_in("ada@example.com").await;

    let id = product.id.to_string();
    site.post("/wishlist/add", &[("product_id", &id)]).await;
    let response = site.post("/wishlist/add", &[("product_id", &id)]).await;
    assert_eq!(response.redirect_target(), "/wishlist");

    let page = site.get("/wishlist").await;
    assert!(page.body.contains("This item is already in your wishlist"));
    assert!(!page.body.contains("Failed to add item"));
    assert_eq!(site.backend.wishlist_rows(user), vec![product.id]);
}

#[tokio::test]
async fn test_product_page_reflects_wishlist() {
    let mut site = TestSite::new();
    site.customer("ada@example.com", "Ada");
    let product = site.product("Smoke Detector", Decimal::new(25, 0), 5);
    site.sign_in("ada@example.com").await;
    let path = format!("/product/{}", product.id);

    let page = site.get(&path).await;
    assert!(page.body.contains("Add to wishlist"));

    let response = site
        .post(
            "/wishlist/toggle",
            &[("product_id", &product.id.to_string()), ("next", &path)],
        )
        .await;
    assert_eq!(response.redirect_target(), path);
    assert!(site.get(&path).await.body.contains("Remove from wishlist"));

    site.post(
        "/wishlist/toggle",
        &[("product_id", &product.id.to_string()), ("next", &path)],
    )
    .await;
    assert!(site.get(&path).await.body.contains("Add to wishlist"));
}

#[tokio::test]
async fn test_signed_out_add_touches_nothing() {
    let mut site = TestSite::new();
    let product = site.product("Extinguisher", Decimal::new(50, 0), 3);
    let before = site.backend.mutation_count();

    site.post("/wishlist/add", &[("product_id", &product.id.to_string())])
        .await;

    assert_eq!(site.backend.mutation_count(), before);
    let page = site.get("/wishlist").await;
    assert!(page.body.contains("You need to be signed in to add items to wishlist"));
}
