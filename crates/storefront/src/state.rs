//! Application state shared across handlers.

use std::sync::Arc;

use crate::cache::QueryCache;
use crate::config::StorefrontConfig;
use crate::store::CheckoutStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the checkout store, the per-user query cache and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn CheckoutStore>,
    queries: QueryCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Persistence backend (`PgStore` in production)
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Arc<dyn CheckoutStore>) -> Self {
        let queries = QueryCache::new(config.query_cache_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                queries,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the checkout store.
    #[must_use]
    pub fn store(&self) -> &dyn CheckoutStore {
        self.inner.store.as_ref()
    }

    /// Get the per-user query cache.
    #[must_use]
    pub fn queries(&self) -> &QueryCache {
        &self.inner.queries
    }
}
