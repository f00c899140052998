//! Integration tests for the PyroWarden site.
//!
//! Each test drives the real router, middleware stack included, against a
//! [`MemoryBackend`]. [`TestSite`] plays the browser: it keeps the session
//! cookie between requests and reports redirects without following them.
//!
//! ```bash
//! cargo test -p pyrowarden-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{IpAddr, Ipv4Addr};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use pyrowarden_core::{AppRole, InternshipStatus, ProductStatus, UserId};
use pyrowarden_storefront::config::{SiteConfig, SupabaseConfig};
use pyrowarden_storefront::middleware::SESSION_COOKIE_NAME;
use pyrowarden_storefront::state::AppState;
use pyrowarden_storefront::supabase::{
    Internship, InternshipInput, MemoryBackend, Product, ProductInput,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tower::ServiceExt;

/// Password used for every seeded account.
pub const PASSWORD: &str = "correct-horse-battery";

/// Client address sent in `x-forwarded-for`, keying the rate limiters.
const CLIENT_IP: &str = "203.0.113.7";

/// Configuration pointing at a project that is never contacted.
#[must_use]
pub fn test_config() -> SiteConfig {
    SiteConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        supabase: SupabaseConfig {
            url: url::Url::parse("https://project.supabase.invalid/")
                .unwrap_or_else(|e| panic!("test URL: {e}")),
            anon_key: SecretString::from("unused-in-memory"),
            service_role_key: None,
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A response with its body already read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    /// `Location` of a redirect.
    pub location: Option<String>,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Assert a 303 redirect and return its target.
    ///
    /// # Panics
    ///
    /// Panics if the response is not a 303 with a `Location`.
    #[must_use]
    pub fn redirect_target(&self) -> &str {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        self.location
            .as_deref()
            .unwrap_or_else(|| panic!("redirect without Location"))
    }

    /// The `value` attribute of the first input named `name`.
    #[must_use]
    pub fn input_value(&self, name: &str) -> Option<&str> {
        let marker = format!("name=\"{name}\" value=\"");
        let start = self.body.find(&marker)? + marker.len();
        let len = self.body.get(start..)?.find('"')?;
        self.body.get(start..start + len)
    }
}

/// The site under test plus one visitor's cookie jar.
pub struct TestSite {
    pub backend: MemoryBackend,
    router: Router,
    session_cookie: Option<String>,
}

impl Default for TestSite {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSite {
    /// A fresh site with an empty backend.
    #[must_use]
    pub fn new() -> Self {
        let backend = MemoryBackend::new();
        let state = AppState::with_backend(test_config(), backend.clone());
        Self {
            backend,
            router: pyrowarden_storefront::app(state),
            session_cookie: None,
        }
    }

    /// A second visitor on the same site, with no cookies.
    #[must_use]
    pub fn new_visitor(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            router: self.router.clone(),
            session_cookie: None,
        }
    }

    /// `GET path`.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Request::get(path), Body::empty()).await
    }

    /// `POST path` with a urlencoded form.
    pub async fn post(&mut self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = form
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let builder = Request::post(path).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        self.send(builder, Body::from(body)).await
    }

    /// Sign in through the form and assert it succeeded.
    ///
    /// # Panics
    ///
    /// Panics if sign-in does not redirect to `/`.
    pub async fn sign_in(&mut self, email: &str) {
        let response = self
            .post(
                "/auth/sign-in",
                &[("email", email), ("password", PASSWORD), ("next", "/")],
            )
            .await;
        assert_eq!(response.redirect_target(), "/", "sign-in failed for {email}");
    }

    /// Register a confirmed customer.
    pub fn customer(&self, email: &str, name: &str) -> UserId {
        self.backend.register_user(email, PASSWORD, Some(name))
    }

    /// Register a confirmed customer holding the admin role.
    pub fn admin(&self, email: &str) -> UserId {
        let id = self.backend.register_user(email, PASSWORD, Some("Site Admin"));
        self.backend.seed_role(id, AppRole::Admin);
        id
    }

    /// Seed an active product.
    pub fn product(&self, name: &str, price: Decimal, stock: i32) -> Product {
        self.backend.seed_product(ProductInput {
            name: name.to_string(),
            description: Some(format!("{name} for every room")),
            price,
            compare_price: None,
            sku: None,
            stock_quantity: stock,
            images: Vec::new(),
            category: Some("Detection".to_string()),
            tags: Vec::new(),
            status: ProductStatus::Active,
            featured: true,
        })
    }

    /// Seed an open internship.
    pub fn internship(&self, title: &str, max_applications: Option<i32>) -> Internship {
        self.backend.seed_internship(InternshipInput {
            title: title.to_string(),
            description: "Build things that stop fires".to_string(),
            requirements: vec!["Curiosity".to_string()],
            responsibilities: Vec::new(),
            duration: "3 months".to_string(),
            location: "Denver, CO".to_string(),
            kind: "hybrid".to_string(),
            department: "Engineering".to_string(),
            salary_range: None,
            benefits: Vec::new(),
            status: InternshipStatus::Open,
            max_applications,
            start_date: None,
            end_date: None,
        })
    }

    async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let mut builder = builder.header("x-forwarded-for", CLIENT_IP);
        if let Some(cookie) = &self.session_cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder
            .body(body)
            .unwrap_or_else(|e| panic!("request: {e}"));

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|e| match e {});

        let cookie_prefix = format!("{SESSION_COOKIE_NAME}=");
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            if let Some(pair) = value.split(';').next().filter(|p| p.starts_with(&cookie_prefix)) {
                self.session_cookie = Some(pair.to_string());
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let location = headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_else(|e| panic!("body: {e}"));

        TestResponse {
            status,
            location,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
