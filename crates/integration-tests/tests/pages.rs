//! Public pages, health checks and response headers.

use axum::http::header;
use pyrowarden_integration_tests::TestSite;
use rust_decimal::Decimal;

#[tokio::test]
async fn test_health_endpoints() {
    let mut site = TestSite::new();
    let live = site.get("/health").await;
    assert_eq!(live.status, 200);
    assert_eq!(live.body, "ok");
    assert_eq!(site.get("/health/ready").await.status, 200);

    site.backend.fail_reads(true);
    assert_eq!(site.get("/health/ready").await.status, 503);
}

#[tokio::test]
async fn test_home_lists_featured_products() {
    let mut site = TestSite::new();
    site.product("Flame Sensor", Decimal::new(4999, 2), 5);

    let page = site.get("/").await;
    assert_eq!(page.status, 200);
    assert!(page.body.contains("Flame Sensor"));
    assert!(page.body.contains("$49.99"));
    assert!(page.body.contains("Sign in"));
}

#[tokio::test]
async fn test_unknown_path_renders_not_found() {
    let mut site = TestSite::new();
    let page = site.get("/no-such-page").await;
    assert_eq!(page.status, 404);
    assert!(page.body.contains("Page not found"));
}

#[tokio::test]
async fn test_missing_product_redirects_with_notice() {
    let mut site = TestSite::new();
    let response = site.get("/product/not-a-uuid").await;
    assert_eq!(response.redirect_target(), "/products");
    assert!(site.get("/products").await.body.contains("Product not found"));
}

#[tokio::test]
async fn test_read_failure_shows_notice() {
    let mut site = TestSite::new();
    site.backend.fail_reads(true);
    let page = site.get("/products").await;
    assert_eq!(page.status, 200);
    assert!(page.body.contains("notice-error"));
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let mut site = TestSite::new();
    let page = site.get("/about").await;
    assert_eq!(page.headers[header::X_FRAME_OPTIONS], "DENY");
    assert!(page.headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert!(page.headers.contains_key("x-request-id"));
}
