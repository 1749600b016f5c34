//! CORS (Cross-Origin Resource Sharing) middleware implementation
//!
//! `cors` applies the configured policy; `cors:https://a.example,https://b.example`
//! restricts it to the listed origins. The middleware only writes headers:
//! a disallowed origin gets none, and the request goes on either way.

use crate::config::{validate_origin, CorsConfig};
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, VARY,
};
use http::{HeaderMap, HeaderValue};
use std::collections::BTreeSet;
use switchyard_http::{
    Middleware, MiddlewareError, MiddlewareRejection, MiddlewareSpec, RequestContext, RouteContext,
};

/// CORS middleware that handles cross-origin requests
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// Build from `cors[:origin,...]`, starting from `base`
    pub fn from_spec(spec: &MiddlewareSpec, base: &CorsConfig) -> Result<Self, MiddlewareError> {
        let mut config = base.clone();
        if !spec.params.is_empty() {
            let origins = spec
                .params
                .iter()
                .map(|param| {
                    let origin = param.as_text().to_string();
                    validate_origin(&origin)
                        .map(|_| origin)
                        .map_err(|e| MiddlewareError::invalid_parameters(&spec.name, e.to_string()))
                })
                .collect::<Result<BTreeSet<_>, _>>()?;
            config.allowed_origins = Some(origins);
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &CorsConfig {
        &self.config
    }

    fn insert_joined(headers: &mut HeaderMap, name: http::HeaderName, values: &BTreeSet<String>) {
        if values.is_empty() {
            return;
        }
        let joined = values.iter().cloned().collect::<Vec<_>>().join(", ");
        match HeaderValue::from_str(&joined) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(e) => tracing::warn!(header = %name, error = %e, "skipping invalid CORS header value"),
        }
    }

    fn add_cors_headers(&self, headers: &mut HeaderMap, origin: &str) {
        if self.config.is_wildcard() {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        } else {
            match HeaderValue::from_str(origin) {
                Ok(value) => {
                    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
                    headers.append(VARY, HeaderValue::from_static("origin"));
                }
                Err(_) => return,
            }
        }

        if self.config.allow_credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        Self::insert_joined(headers, ACCESS_CONTROL_EXPOSE_HEADERS, &self.config.exposed_headers);
    }

    fn add_preflight_headers(&self, headers: &mut HeaderMap) {
        Self::insert_joined(headers, ACCESS_CONTROL_ALLOW_METHODS, &self.config.allowed_methods);
        Self::insert_joined(headers, ACCESS_CONTROL_ALLOW_HEADERS, &self.config.allowed_headers);
        if let Some(max_age) = self.config.max_age {
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
        }
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &str {
        "cors"
    }

    fn handle(&self, ctx: &RouteContext<'_>, headers: &mut HeaderMap) -> Result<(), MiddlewareRejection> {
        let Some(origin) = ctx.header("origin") else {
            return Ok(());
        };

        if !self.config.allows_origin(origin) {
            tracing::debug!(origin = %origin, route = %ctx.route().identity(), "origin not allowed by CORS policy");
            return Ok(());
        }

        self.add_cors_headers(headers, origin);
        if ctx.header("access-control-request-method").is_some() {
            self.add_preflight_headers(headers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use switchyard_http::testing::{route_fixture, TestRequest};

    fn run(middleware: &CorsMiddleware, request: &TestRequest) -> HeaderMap {
        let route = route_fixture("/cors");
        let params = HashMap::new();
        let ctx = RouteContext::new(request, &route, &params);
        let mut headers = HeaderMap::new();
        assert!(middleware.handle(&ctx, &mut headers).is_ok());
        headers
    }

    #[test]
    fn test_wildcard_policy() {
        let cors = CorsMiddleware::new(CorsConfig::permissive());
        let headers = run(&cors, &TestRequest::get().header("Origin", "https://any.example"));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(!headers.contains_key(ACCESS_CONTROL_ALLOW_METHODS));

        assert!(run(&cors, &TestRequest::get()).is_empty());
    }

    #[test]
    fn test_origins_from_spec() {
        let spec = MiddlewareSpec::parse("cors:https://trusted.example").unwrap();
        let cors = CorsMiddleware::from_spec(&spec, &CorsConfig::default()).unwrap();

        let allowed = run(&cors, &TestRequest::get().header("Origin", "https://trusted.example"));
        assert_eq!(allowed[ACCESS_CONTROL_ALLOW_ORIGIN], "https://trusted.example");
        assert_eq!(allowed[VARY], "origin");

        for spoofed in ["null", "http://trusted.example", "https://malicious.trusted.example"] {
            let headers = run(&cors, &TestRequest::get().header("Origin", spoofed));
            assert!(!headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN), "{spoofed}");
        }
    }

    #[test]
    fn test_preflight_headers() {
        let cors = CorsMiddleware::new(
            CorsConfig::strict(["https://app.example"])
                .allow_methods(&["get", "post"])
                .expose_headers(&["X-RateLimit-Limit"]),
        );
        let headers = run(
            &cors,
            &TestRequest::get()
                .header("Origin", "https://app.example")
                .header("Access-Control-Request-Method", "POST"),
        );
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[ACCESS_CONTROL_EXPOSE_HEADERS], "x-ratelimit-limit");
        assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "300");
    }

    #[test]
    fn test_invalid_origin_parameter() {
        let spec = MiddlewareSpec::parse("cors:trusted.example").unwrap();
        assert!(matches!(
            CorsMiddleware::from_spec(&spec, &CorsConfig::default()),
            Err(MiddlewareError::InvalidParameters { .. })
        ));
    }
}
