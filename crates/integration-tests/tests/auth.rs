//! Sign-in, sign-up and sign-out.

use pyrowarden_integration_tests::{PASSWORD, TestSite};

#[tokio::test]
async fn test_sign_in_returns_to_next() {
    let mut site = TestSite::new();
    site.customer("ada@example.com", "Ada");

    let response = site
        .post(
            "/auth/sign-in",
            &[
                ("email", "ada@example.com"),
                ("password", PASSWORD),
                ("next", "/dashboard"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/dashboard");

    let page = site.get("/dashboard").await;
    assert_eq!(page.status, 200);
    assert!(page.body.contains("Signed in as ada@example.com"));
    assert!(page.body.contains("Welcome back, Ada"));

    // Signed-in visitors skip the auth page.
    assert_eq!(site.get("/auth?next=/cart").await.redirect_target(), "/cart");
}

#[tokio::test]
async fn test_wrong_password_stays_on_auth_page() {
    let mut site = TestSite::new();
    site.customer("ada@example.com", "Ada");

    let response = site
        .post(
            "/auth/sign-in",
            &[("email", "ada@example.com"), ("password", "wrong-password")],
        )
        .await;
    assert_eq!(response.redirect_target(), "/auth");

    let page = site.get("/auth").await;
    assert!(page.body.contains("Sign in failed"));
    assert_eq!(site.get("/dashboard").await.redirect_target(), "/auth?next=%2Fdashboard");
}

#[tokio::test]
async fn test_sign_up_with_confirmation() {
    let mut site = TestSite::new();
    site.backend.require_email_confirmation(true);

    let response = site
        .post(
            "/auth/sign-up",
            &[
                ("email", "grace@example.com"),
                ("password", PASSWORD),
                ("full_name", "Grace"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/auth");
    assert!(site.get("/auth").await.body.contains("We sent a confirmation link to grace@example.com"));
}

#[tokio::test]
async fn test_sign_up_then_sign_out() {
    let mut site = TestSite::new();
    let response = site
        .post(
            "/auth/sign-up",
            &[("email", "grace@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.redirect_target(), "/");
    assert_eq!(site.get("/profile").await.status, 200);

    assert_eq!(site.post("/auth/sign-out", &[]).await.redirect_target(), "/");
    let home = site.get("/").await;
    assert!(home.body.contains("You have been signed out"));
    assert_eq!(site.get("/profile").await.redirect_target(), "/auth?next=%2Fprofile");
}

#[tokio::test]
async fn test_sessions_are_per_visitor() {
    let mut site = TestSite::new();
    site.customer("ada@example.com", "Ada");
    site.sign_in("ada@example.com").await;

    let mut stranger = site.new_visitor();
    assert_eq!(stranger.get("/dashboard").await.redirect_target(), "/auth?next=%2Fdashboard");
}
