//! Single-use token (nonce) protection
//!
//! A token is issued for an action and a caller, and is accepted once
//! within its lifetime. `nonce:save_post` reads the token from the
//! configured header, else from the configured body or query field.

use crate::config::NonceConfig;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use http::HeaderMap;
use rand::{thread_rng, Rng};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use switchyard_http::{
    Middleware, MiddlewareError, MiddlewareRejection, MiddlewareSpec, RequestContext, RouteContext,
};

/// Storage for issued tokens
pub trait NonceStore: Send + Sync + fmt::Debug {
    /// Issue a fresh token bound to `action` and `caller_key`
    fn issue(&self, action: &str, caller_key: &str) -> String;

    /// Accept and consume `token` if it was issued for this action and
    /// caller and has not expired
    fn verify(&self, action: &str, token: &str, caller_key: &str) -> bool;
}

#[derive(Debug, Clone)]
struct IssuedToken {
    action: String,
    caller_key: String,
    expires_at: Instant,
}

/// Tokens held in process memory, stored by digest
#[derive(Debug)]
pub struct InMemoryNonceStore {
    lifetime: Duration,
    tokens: Mutex<HashMap<String, IssuedToken>>,
}

impl InMemoryNonceStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &NonceConfig) -> Self {
        Self::new(config.lifetime())
    }

    fn digest(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// `issue` against an explicit clock
    pub fn issue_at(&self, action: &str, caller_key: &str, now: Instant) -> String {
        let token_bytes: [u8; 32] = thread_rng().gen();
        let token = URL_SAFE_NO_PAD.encode(token_bytes);

        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.retain(|_, issued| issued.expires_at > now);
        tokens.insert(
            Self::digest(&token),
            IssuedToken {
                action: action.to_string(),
                caller_key: caller_key.to_string(),
                expires_at: now + self.lifetime,
            },
        );
        token
    }

    /// `verify` against an explicit clock
    pub fn verify_at(&self, action: &str, token: &str, caller_key: &str, now: Instant) -> bool {
        let digest = Self::digest(token);
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(issued) = tokens.get(&digest) else {
            return false;
        };
        if issued.expires_at <= now {
            tokens.remove(&digest);
            return false;
        }
        // A token presented for the wrong action or caller stays valid for its owner
        if issued.action != action || issued.caller_key != caller_key {
            return false;
        }
        tokens.remove(&digest);
        true
    }

    /// Outstanding tokens, expired ones included until the next issue
    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NonceStore for InMemoryNonceStore {
    fn issue(&self, action: &str, caller_key: &str) -> String {
        self.issue_at(action, caller_key, Instant::now())
    }

    fn verify(&self, action: &str, token: &str, caller_key: &str) -> bool {
        self.verify_at(action, token, caller_key, Instant::now())
    }
}

/// Rejects requests without a valid single-use token for its action with 403
#[derive(Debug, Clone)]
pub struct NonceMiddleware {
    action: String,
    store: Arc<dyn NonceStore>,
    config: NonceConfig,
}

impl NonceMiddleware {
    pub fn new(action: impl Into<String>, store: Arc<dyn NonceStore>, config: NonceConfig) -> Self {
        Self {
            action: action.into(),
            store,
            config,
        }
    }

    /// Build from `nonce:action`
    pub fn from_spec(
        spec: &MiddlewareSpec,
        store: Arc<dyn NonceStore>,
        config: NonceConfig,
    ) -> Result<Self, MiddlewareError> {
        match spec.params.as_slice() {
            [action] => Ok(Self::new(action.as_text(), store, config)),
            _ => Err(MiddlewareError::invalid_parameters(
                &spec.name,
                "expected exactly one parameter (action)",
            )),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    fn extract_token<'c>(&self, ctx: &'c RouteContext<'_>) -> Option<&'c str> {
        ctx.header(&self.config.header)
            .or_else(|| ctx.body_param(&self.config.field).and_then(Value::as_str))
            .or_else(|| ctx.query_param(&self.config.field).and_then(Value::as_str))
            .filter(|token| !token.is_empty())
    }
}

impl Middleware for NonceMiddleware {
    fn name(&self) -> &str {
        "nonce"
    }

    fn handle(&self, ctx: &RouteContext<'_>, _headers: &mut HeaderMap) -> Result<(), MiddlewareRejection> {
        let Some(token) = self.extract_token(ctx) else {
            return Err(MiddlewareRejection::forbidden("Missing security token"));
        };

        if self.store.verify(&self.action, token, &ctx.caller_key()) {
            Ok(())
        } else {
            tracing::warn!(action = %self.action, route = %ctx.route().identity(), "rejected security token");
            Err(MiddlewareRejection::forbidden("Invalid or expired security token"))
        }
    }
}
