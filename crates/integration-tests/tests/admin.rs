//! Admin access and role management.

use pyrowarden_core::AppRole;
use pyrowarden_integration_tests::TestSite;
use pyrowarden_storefront::supabase::RoleBackend;

#[tokio::test]
async fn test_signed_out_visitor_sent_to_login() {
    let mut site = TestSite::new();
    let response = site.get("/admin/users").await;
    assert_eq!(response.redirect_target(), "/auth?next=%2Fadmin%2Fusers");
}

#[tokio::test]
async fn test_customer_sent_to_dashboard() {
    let mut site = TestSite::new();
    site.customer("ada@example.com", "Ada");
    site.sign_in("ada@example.com").await;

    assert_eq!(site.get("/admin").await.redirect_target(), "/dashboard");
    let dashboard = site.get("/dashboard").await;
    assert_eq!(dashboard.status, 200);
    assert!(!dashboard.body.contains("href=\"/admin\""));
}

#[tokio::test]
async fn test_role_check_failure_means_not_admin() {
    let mut site = TestSite::new();
    site.admin("ops@pyrowarden.com");
    site.backend.fail_role_checks(true);
    site.sign_in("ops@pyrowarden.com").await;

    assert_eq!(site.get("/admin").await.redirect_target(), "/dashboard");
}

#[tokio::test]
async fn test_admin_toggles_role() {
    let mut site = TestSite::new();
    site.admin("ops@pyrowarden.com");
    let user = site.customer("ada@example.com", "Ada");
    let service = site.backend.service_token();
    site.sign_in("ops@pyrowarden.com").await;

    let page = site.get("/admin").await;
    assert_eq!(page.status, 200);
    assert!(page.body.contains("Admin dashboard"));

    let path = format!("/admin/users/{user}");
    let edit = site.get(&path).await;
    assert_eq!(edit.status, 200);
    assert_eq!(edit.input_value("full_name"), Some("Ada"));

    let form = [("full_name", "Ada Lovelace"), ("phone", ""), ("role", "admin")];
    assert_eq!(site.post(&path, &form).await.redirect_target(), "/admin/users");
    assert!(site.backend.has_role(&service, user, AppRole::Admin).await.unwrap());

    let listing = site.get("/admin/users?q=lovelace").await;
    assert!(listing.body.contains("Ada Lovelace"));

    let form = [("full_name", "Ada Lovelace"), ("phone", ""), ("role", "user")];
    site.post(&path, &form).await;
    assert!(!site.backend.has_role(&service, user, AppRole::Admin).await.unwrap());
}

#[tokio::test]
async fn test_revoke_refused_while_roles_unknown() {
    let mut site = TestSite::new();
    site.admin("ops@pyrowarden.com");
    let other = site.admin("lead@pyrowarden.com");
    let service = site.backend.service_token();
    site.sign_in("ops@pyrowarden.com").await;

    site.backend.fail_role_checks(true);
    let path = format!("/admin/users/{other}");
    let form = [("full_name", "Lead"), ("phone", ""), ("role", "user")];
    assert_eq!(site.post(&path, &form).await.redirect_target(), "/admin/users");

    let listing = site.get("/admin/users").await;
    assert!(listing.body.contains("Failed to load user roles"));

    site.backend.fail_role_checks(false);
    assert!(site.backend.has_role(&service, other, AppRole::Admin).await.unwrap());
}
