//! Security configuration types and utilities

use crate::{SecurityError, SecurityResult};
use http::HeaderName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use switchyard_http::RoutingConfig;

/// Configuration shared by the security middleware
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// CORS policy used by `cors` when the `cors` entry carries no origins
    pub cors: CorsConfig,

    pub rate_limit: RateLimitConfig,

    pub nonce: NonceConfig,
}

impl SecurityConfig {
    /// Defaults, with the token settings taken from the routing configuration
    pub fn for_routing(routing: &RoutingConfig) -> Self {
        Self {
            nonce: NonceConfig::from(routing),
            ..Self::default()
        }
    }

    pub fn cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    pub fn validate(&self) -> SecurityResult<()> {
        self.cors.validate()?;
        self.nonce.validate()
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins - None means allow all origins (*)
    pub allowed_origins: Option<BTreeSet<String>>,

    /// Allowed HTTP methods, reported on preflight requests
    pub allowed_methods: BTreeSet<String>,

    /// Allowed request headers, reported on preflight requests
    pub allowed_headers: BTreeSet<String>,

    /// Headers exposed to the client
    pub exposed_headers: BTreeSet<String>,

    /// Whether to allow credentials (cookies, authorization headers)
    pub allow_credentials: bool,

    /// Maximum age for preflight cache (seconds)
    pub max_age: Option<u32>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: None,
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_headers: ["content-type", "authorization", "x-requested-with", "x-nonce"]
                .into_iter()
                .map(String::from)
                .collect(),
            exposed_headers: BTreeSet::new(),
            allow_credentials: false,
            max_age: Some(86400), // 24 hours
        }
    }
}

impl CorsConfig {
    /// Any origin, no credentials
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Only the listed origins, with credentials
    pub fn strict<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: Some(origins.into_iter().map(Into::into).collect()),
            allow_credentials: true,
            max_age: Some(300),
            ..Self::default()
        }
    }

    pub fn allow_origin(mut self, origin: &str) -> Self {
        self.allowed_origins
            .get_or_insert_with(BTreeSet::new)
            .insert(origin.to_string());
        self
    }

    pub fn allow_any_origin(mut self) -> Self {
        self.allowed_origins = None;
        self
    }

    pub fn allow_methods(mut self, methods: &[&str]) -> Self {
        self.allowed_methods = methods.iter().map(|m| m.to_ascii_uppercase()).collect();
        self
    }

    pub fn allow_headers(mut self, headers: &[&str]) -> Self {
        self.allowed_headers = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
        self
    }

    pub fn expose_headers(mut self, headers: &[&str]) -> Self {
        self.exposed_headers = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Whether `origin` passes this policy
    pub fn allows_origin(&self, origin: &str) -> bool {
        match &self.allowed_origins {
            None => true,
            Some(origins) => origins.contains("*") || origins.contains(origin),
        }
    }

    /// Whether the policy answers with `*` rather than echoing the origin
    pub fn is_wildcard(&self) -> bool {
        let any = self
            .allowed_origins
            .as_ref()
            .map_or(true, |origins| origins.contains("*"));
        any && !self.allow_credentials
    }

    /// Origins must be bare `scheme://host[:port]`; header names must be valid
    pub fn validate(&self) -> SecurityResult<()> {
        for origin in self.allowed_origins.iter().flatten() {
            validate_origin(origin)?;
        }
        for name in self.allowed_headers.iter().chain(&self.exposed_headers) {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| SecurityError::InvalidHeaderName { name: name.clone() })?;
        }
        Ok(())
    }
}

/// Check a single origin entry
pub fn validate_origin(origin: &str) -> SecurityResult<()> {
    if origin == "*" {
        return Ok(());
    }
    let invalid = |reason: &str| SecurityError::InvalidOrigin {
        origin: origin.to_string(),
        reason: reason.to_string(),
    };

    let parsed = url::Url::parse(origin).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.origin().ascii_serialization() != origin {
        return Err(invalid("expected scheme://host[:port] with no path"));
    }
    Ok(())
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Write `x-ratelimit-limit` on every call and `retry-after` on rejection
    pub emit_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { emit_headers: true }
    }
}

/// Where single-use tokens are read from and how long they live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonceConfig {
    pub header: String,
    /// Body field, falling back to the query string
    pub field: String,
    pub lifetime_secs: u64,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self::from(&RoutingConfig::default())
    }
}

impl From<&RoutingConfig> for NonceConfig {
    fn from(routing: &RoutingConfig) -> Self {
        Self {
            header: routing.nonce_header.clone(),
            field: routing.nonce_field.clone(),
            lifetime_secs: routing.nonce_lifetime_secs,
        }
    }
}

impl NonceConfig {
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    pub fn validate(&self) -> SecurityResult<()> {
        HeaderName::from_bytes(self.header.as_bytes()).map_err(|_| SecurityError::InvalidHeaderName {
            name: self.header.clone(),
        })?;
        if self.field.trim().is_empty() {
            return Err(SecurityError::config("nonce field must not be empty"));
        }
        if self.lifetime_secs == 0 {
            return Err(SecurityError::config("nonce lifetime must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_validation() {
        assert!(validate_origin("*").is_ok());
        assert!(validate_origin("https://trusted.example").is_ok());
        assert!(validate_origin("http://localhost:3000").is_ok());

        for bad in ["trusted.example", "https://trusted.example/", "https://trusted.example/app", "ftp://files.example"] {
            assert!(
                matches!(validate_origin(bad), Err(SecurityError::InvalidOrigin { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_cors_policy() {
        let any = CorsConfig::permissive();
        assert!(any.allows_origin("https://anything.example"));
        assert!(any.is_wildcard());

        let strict = CorsConfig::strict(["https://trusted.example"]);
        assert!(strict.allows_origin("https://trusted.example"));
        assert!(!strict.allows_origin("http://trusted.example"));
        assert!(!strict.allows_origin("https://malicious.trusted.example"));
        assert!(!strict.is_wildcard());
        assert!(strict.validate().is_ok());

        let bad = CorsConfig::default().allow_headers(&["bad header"]);
        assert!(matches!(bad.validate(), Err(SecurityError::InvalidHeaderName { .. })));
    }

    #[test]
    fn test_nonce_config_follows_routing_config() {
        let routing = RoutingConfig {
            nonce_header: "x-wp-nonce".to_string(),
            nonce_lifetime_secs: 60,
            ..RoutingConfig::default()
        };
        let config = SecurityConfig::for_routing(&routing);
        assert_eq!(config.nonce.header, "x-wp-nonce");
        assert_eq!(config.nonce.field, "_nonce");
        assert_eq!(config.nonce.lifetime(), Duration::from_secs(60));
        assert!(config.validate().is_ok());

        let broken = NonceConfig {
            lifetime_secs: 0,
            ..NonceConfig::default()
        };
        assert!(matches!(broken.validate(), Err(SecurityError::ConfigError { .. })));
    }
}
