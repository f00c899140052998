//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::SiteConfig;
use crate::supabase::{Backend, BackendError, SupabaseClient};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the immutable configuration and the
/// backend client. Generic over the backend so tests can run the router
/// against the in-memory backend.
pub struct AppState<B = SupabaseClient> {
    inner: Arc<AppStateInner<B>>,
}

struct AppStateInner<B> {
    config: SiteConfig,
    backend: B,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl AppState<SupabaseClient> {
    /// Create the production state with a Supabase client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: SiteConfig) -> Result<Self, BackendError> {
        let backend = SupabaseClient::new(&config.supabase)?;
        Ok(Self::with_backend(config, backend))
    }
}

impl<B: Backend> AppState<B> {
    /// Create state around an existing backend.
    #[must_use]
    pub fn with_backend(config: SiteConfig, backend: B) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, backend }),
        }
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }
}
