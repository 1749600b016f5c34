//! Security middleware implementations

pub mod cors;
pub mod nonce;
pub mod rate_limit;

pub use cors::CorsMiddleware;
pub use nonce::{InMemoryNonceStore, NonceMiddleware, NonceStore};
pub use rate_limit::{CounterStore, InMemoryCounterStore, RateLimitMiddleware};
