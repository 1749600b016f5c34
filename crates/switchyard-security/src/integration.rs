//! Security Middleware Integration
//!
//! Registers `rate_limit`, `cors` and `nonce` with a
//! [`MiddlewareRegistry`], sharing one counter store and one token store
//! across every route that uses them.

use crate::config::SecurityConfig;
use crate::middleware::{
    CorsMiddleware, CounterStore, InMemoryCounterStore, InMemoryNonceStore, NonceMiddleware, NonceStore,
    RateLimitMiddleware,
};
use crate::SecurityResult;
use std::sync::Arc;
use switchyard_http::{Middleware, MiddlewareRegistry, MiddlewareSpec};

/// Configuration plus the stores backing the stateful middleware
#[derive(Debug, Clone)]
pub struct SecurityServices {
    pub config: SecurityConfig,
    pub counters: Arc<dyn CounterStore>,
    pub nonces: Arc<dyn NonceStore>,
}

impl SecurityServices {
    /// In-memory stores sized by `config`
    pub fn in_memory(config: SecurityConfig) -> Self {
        let nonces = Arc::new(InMemoryNonceStore::from_config(&config.nonce));
        Self {
            config,
            counters: Arc::new(InMemoryCounterStore::new()),
            nonces,
        }
    }

    pub fn with_counter_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.counters = store;
        self
    }

    pub fn with_nonce_store(mut self, store: Arc<dyn NonceStore>) -> Self {
        self.nonces = store;
        self
    }
}

impl Default for SecurityServices {
    fn default() -> Self {
        Self::in_memory(SecurityConfig::default())
    }
}

/// Validate `services.config` and register the security middleware factories
pub fn register_security(registry: &mut MiddlewareRegistry, services: &SecurityServices) -> SecurityResult<()> {
    services.config.validate()?;

    let counters = Arc::clone(&services.counters);
    let rate_limit = services.config.rate_limit.clone();
    registry.register("rate_limit", move |spec: &MiddlewareSpec| {
        let middleware = RateLimitMiddleware::from_spec(spec, Arc::clone(&counters), rate_limit.clone())?;
        Ok(Arc::new(middleware) as Arc<dyn Middleware>)
    });

    let cors = services.config.cors.clone();
    registry.register("cors", move |spec: &MiddlewareSpec| {
        Ok(Arc::new(CorsMiddleware::from_spec(spec, &cors)?) as Arc<dyn Middleware>)
    });

    let nonces = Arc::clone(&services.nonces);
    let nonce = services.config.nonce.clone();
    registry.register("nonce", move |spec: &MiddlewareSpec| {
        let middleware = NonceMiddleware::from_spec(spec, Arc::clone(&nonces), nonce.clone())?;
        Ok(Arc::new(middleware) as Arc<dyn Middleware>)
    });

    tracing::debug!(
        cors_origins = ?services.config.cors.allowed_origins,
        nonce_header = %services.config.nonce.header,
        "registered security middleware"
    );
    Ok(())
}
