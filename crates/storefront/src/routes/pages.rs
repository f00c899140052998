//! Home, static pages and the 404 page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Notice;
use crate::state::AppState;
use crate::supabase::{Backend, CatalogBackend, Product, ProductQuery};

/// Number of featured products on the home page.
pub const FEATURED_LIMIT: usize = 6;

// =============================================================================
// Static content
// =============================================================================

/// A product-line card on the home page.
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
}

/// Product lines shown under the hero.
pub const FEATURES: &[Feature] = &[
    Feature {
        title: "Network Security Tools",
        description: "Wireless testing equipment for penetration testing and network analysis.",
    },
    Feature {
        title: "Physical Security Kits",
        description: "RFID analysis tools and access control equipment for security assessments.",
    },
    Feature {
        title: "Hardware Hacking Tools",
        description: "Embedded systems analysis and circuit debugging equipment for IoT research.",
    },
    Feature {
        title: "Social Engineering Kits",
        description: "Awareness training tools for human factor testing.",
    },
];

/// A perk of the internship programme on the careers page.
pub struct Perk {
    pub title: &'static str,
    pub description: &'static str,
}

/// Perks listed on `/careers`.
pub const PERKS: &[Perk] = &[
    Perk {
        title: "Industry Certificate",
        description: "A verified certificate recognized by security teams.",
    },
    Perk {
        title: "Expert Mentorship",
        description: "Work alongside practitioners with real engagement experience.",
    },
    Perk {
        title: "Hands-on Projects",
        description: "Ship tools you can show in your portfolio.",
    },
    Perk {
        title: "Placement Support",
        description: "Career guidance when the internship ends.",
    },
];

// =============================================================================
// Templates
// =============================================================================

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub features: &'static [Feature],
    pub featured: Vec<Product>,
}

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub layout: Layout,
}

/// Careers page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/careers.html")]
pub struct CareersTemplate {
    pub layout: Layout,
    pub perks: &'static [Perk],
}

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/not_found.html")]
pub struct NotFoundTemplate {
    pub layout: Layout,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the home page.
#[instrument(skip_all)]
pub async fn home<B: Backend>(
    State(state): State<AppState<B>>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> HomeTemplate {
    let mut layout = Layout::load(&session, user.as_ref()).await;

    let featured = state
        .backend()
        .list_products(None, ProductQuery::featured(FEATURED_LIMIT))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load featured products");
            layout.push(Notice::error("Error", "Failed to load products"));
            Vec::new()
        });

    HomeTemplate {
        layout,
        features: FEATURES,
        featured,
    }
}

/// Display the about page.
pub async fn about(OptionalAuth(user): OptionalAuth, session: Session) -> AboutTemplate {
    AboutTemplate {
        layout: Layout::load(&session, user.as_ref()).await,
    }
}

/// Display the careers page.
pub async fn careers(OptionalAuth(user): OptionalAuth, session: Session) -> CareersTemplate {
    CareersTemplate {
        layout: Layout::load(&session, user.as_ref()).await,
        perks: PERKS,
    }
}

/// Fallback for unknown paths.
pub async fn not_found(
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            layout: Layout::load(&session, user.as_ref()).await,
        },
    )
}
