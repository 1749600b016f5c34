//! Rate limiting middleware implementation
//!
//! `rate_limit:N,W` allows each caller N calls to the route within a fixed
//! window of W seconds. Counters are keyed by route identity plus caller
//! key, so limits on different routes never share a budget.

use crate::config::RateLimitConfig;
use http::{HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use switchyard_http::{
    Middleware, MiddlewareError, MiddlewareRejection, MiddlewareSpec, RequestContext, RouteContext,
};

/// Counter storage for rate limiting
pub trait CounterStore: Send + Sync + fmt::Debug {
    /// Count one call for `key`; `true` while the count stays within `limit`
    /// for the current window
    fn increment_and_check(&self, key: &str, limit: u64, window_secs: u64) -> bool;
}

/// Counter for one key in its current window
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    started: Instant,
    length: Duration,
}

/// Fixed-window counters held in process memory
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<String, Window>>,
}

impl InMemoryCounterStore {
    /// Entries kept before expired windows are swept
    const SWEEP_THRESHOLD: usize = 10_000;

    pub fn new() -> Self {
        Self::default()
    }

    /// `increment_and_check` against an explicit clock
    pub fn check_at(&self, key: &str, limit: u64, window_secs: u64, now: Instant) -> bool {
        let length = Duration::from_secs(window_secs);
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);

        let window = counters
            .entry(key.to_string())
            .and_modify(|window| {
                if now.saturating_duration_since(window.started) >= window.length {
                    *window = Window {
                        count: 0,
                        started: now,
                        length,
                    };
                }
            })
            .or_insert(Window {
                count: 0,
                started: now,
                length,
            });
        window.count = window.count.saturating_add(1);
        let allowed = window.count <= limit;

        if counters.len() > Self::SWEEP_THRESHOLD {
            counters.retain(|_, window| now.saturating_duration_since(window.started) < window.length);
        }

        allowed
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CounterStore for InMemoryCounterStore {
    fn increment_and_check(&self, key: &str, limit: u64, window_secs: u64) -> bool {
        self.check_at(key, limit, window_secs, Instant::now())
    }
}

/// Rate limiting middleware that tracks requests and enforces limits
#[derive(Debug, Clone)]
pub struct RateLimitMiddleware {
    limit: u64,
    window_secs: u64,
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimitMiddleware {
    pub fn new(limit: u64, window_secs: u64, store: Arc<dyn CounterStore>) -> Self {
        Self {
            limit,
            window_secs,
            store,
            config: RateLimitConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RateLimitConfig) -> Self {
        self.config = config;
        self
    }

    /// Build from `rate_limit:N,W`; both parameters must be positive integers
    pub fn from_spec(
        spec: &MiddlewareSpec,
        store: Arc<dyn CounterStore>,
        config: RateLimitConfig,
    ) -> Result<Self, MiddlewareError> {
        let positive = |index: usize| spec.param(index).and_then(|p| p.as_u64()).filter(|n| *n > 0);
        match (spec.params.len(), positive(0), positive(1)) {
            (2, Some(limit), Some(window_secs)) => Ok(Self::new(limit, window_secs, store).with_config(config)),
            _ => Err(MiddlewareError::invalid_parameters(
                &spec.name,
                "expected two positive integers: max calls and window seconds",
            )),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    fn counter_key(ctx: &RouteContext<'_>) -> String {
        format!("{}|{}", ctx.route().identity(), ctx.caller_key())
    }
}

impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &str {
        "rate_limit"
    }

    fn handle(&self, ctx: &RouteContext<'_>, headers: &mut HeaderMap) -> Result<(), MiddlewareRejection> {
        let key = Self::counter_key(ctx);
        let allowed = self.store.increment_and_check(&key, self.limit, self.window_secs);

        if self.config.emit_headers {
            headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        }
        if allowed {
            return Ok(());
        }

        tracing::warn!(
            key = %key,
            limit = self.limit,
            window_secs = self.window_secs,
            "rate limit exceeded"
        );
        if self.config.emit_headers {
            headers.insert(http::header::RETRY_AFTER, HeaderValue::from(self.window_secs));
        }
        Err(MiddlewareRejection::too_many_requests(format!(
            "Rate limit exceeded: {} requests per {} seconds",
            self.limit, self.window_secs
        )))
    }
}
