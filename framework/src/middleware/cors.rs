//! CORS policy middleware
//!
//! Allow-list policy with explicit rejection:
//! - no `Origin` header: the default (first configured) origin is granted
//! - allowed origin: that exact origin is echoed back with `Vary: Origin`
//! - any other origin: 403 `{"message": "Not allowed by CORS"}`, nothing
//!   downstream runs
//!
//! Preflight `OPTIONS` requests that pass the policy are answered here with
//! 204 and an empty body.
//!
//! `Access-Control-Allow-Credentials` is only sent for origins listed by
//! name, never for one admitted through the `*` entry.

use super::{Middleware, Next};
use crate::config::CorsConfig;
use crate::error::FrameworkError;
use crate::http::{HttpResponse, Request, Response};
use async_trait::async_trait;

pub const ALLOWED_METHODS: &str = "GET,POST,PUT,DELETE,PATCH,OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type,Authorization";

const WILDCARD: &str = "*";

/// Outcome of evaluating a request origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    /// Grant access to this origin
    Allow(String),
    /// Origin is not on the allow-list
    Reject(String),
}

/// Allow-list of request origins
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
        }
    }

    pub fn evaluate(&self, origin: Option<&str>) -> CorsDecision {
        let Some(origin) = origin else {
            return CorsDecision::Allow(self.default_origin().to_string());
        };
        let normalized = origin.trim_end_matches('/');
        let allowed = self
            .allowed_origins
            .iter()
            .any(|candidate| candidate == WILDCARD || candidate == normalized);
        if allowed {
            CorsDecision::Allow(origin.to_string())
        } else {
            CorsDecision::Reject(origin.to_string())
        }
    }

    fn default_origin(&self) -> &str {
        self.allowed_origins
            .iter()
            .find(|origin| origin.as_str() != WILDCARD)
            .map(String::as_str)
            .unwrap_or(WILDCARD)
    }

    /// Attach the grant headers for `origin`
    pub fn apply(&self, response: HttpResponse, origin: &str) -> HttpResponse {
        let response = response
            .set_header("Access-Control-Allow-Origin", origin)
            .set_header("Access-Control-Allow-Methods", ALLOWED_METHODS)
            .set_header("Access-Control-Allow-Headers", ALLOWED_HEADERS)
            .set_header("Vary", "Origin");
        if self.is_listed(origin) {
            response.set_header("Access-Control-Allow-Credentials", "true")
        } else {
            response
        }
    }

    fn is_listed(&self, origin: &str) -> bool {
        let normalized = origin.trim_end_matches('/');
        self.allowed_origins
            .iter()
            .any(|candidate| candidate != WILDCARD && candidate == normalized)
    }
}

/// First stage of the pipeline
pub struct CorsMiddleware {
    policy: CorsPolicy,
}

impl CorsMiddleware {
    pub fn new(policy: CorsPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    async fn handle(&self, request: Request, next: Next) -> Response {
        let granted = match self.policy.evaluate(request.origin()) {
            CorsDecision::Allow(origin) => origin,
            CorsDecision::Reject(origin) => {
                tracing::warn!(origin = %origin, path = request.path(), "origin rejected by CORS policy");
                return Err(FrameworkError::cors_rejected(origin).into());
            }
        };

        if request.method() == http::Method::OPTIONS {
            return Ok(self.policy.apply(HttpResponse::no_content(), &granted));
        }

        match next(request).await {
            Ok(response) => Ok(self.policy.apply(response, &granted)),
            Err(response) => Err(self.policy.apply(response, &granted)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::next_fn;
    use crate::testing;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(
            &CorsConfig::parse("https://shop.test,https://admin.shop.test").unwrap(),
        )
    }

    fn counting_next(hits: Arc<AtomicUsize>) -> Next {
        next_fn(move |_request: Request| {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(HttpResponse::text("downstream"))
            }
        })
    }

    #[test]
    fn evaluates_allow_list() {
        let policy = policy();
        assert_eq!(
            policy.evaluate(None),
            CorsDecision::Allow("https://shop.test".to_string())
        );
        assert_eq!(
            policy.evaluate(Some("https://admin.shop.test")),
            CorsDecision::Allow("https://admin.shop.test".to_string())
        );
        assert_eq!(
            policy.evaluate(Some("https://evil.test")),
            CorsDecision::Reject("https://evil.test".to_string())
        );
    }

    #[test]
    fn wildcard_echoes_any_origin() {
        let policy = CorsPolicy::new(&CorsConfig::parse("*").unwrap());
        assert_eq!(
            policy.evaluate(Some("https://anything.test")),
            CorsDecision::Allow("https://anything.test".to_string())
        );
    }

    #[test]
    fn wildcard_grants_never_allow_credentials() {
        let policy = CorsPolicy::new(&CorsConfig::parse("https://shop.test,*").unwrap());

        let listed = policy.apply(HttpResponse::text("ok"), "https://shop.test");
        assert_eq!(
            listed.header_value("Access-Control-Allow-Credentials"),
            Some("true")
        );

        let via_wildcard = policy.apply(HttpResponse::text("ok"), "https://anything.test");
        assert_eq!(
            via_wildcard.header_value("Access-Control-Allow-Origin"),
            Some("https://anything.test")
        );
        assert_eq!(via_wildcard.header_value("Access-Control-Allow-Credentials"), None);

        let only_wildcard = CorsPolicy::new(&CorsConfig::parse("*").unwrap());
        let default_grant = only_wildcard.apply(HttpResponse::text("ok"), "*");
        assert_eq!(default_grant.header_value("Access-Control-Allow-Credentials"), None);
    }

    #[tokio::test]
    async fn missing_origin_gets_default_grant() {
        let hits = Arc::new(AtomicUsize::new(0));
        let middleware = CorsMiddleware::new(policy());

        let response = middleware
            .handle(
                testing::request("GET", "/api/products", &[], ""),
                counting_next(hits.clone()),
            )
            .await
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            response.header_value("Access-Control-Allow-Origin"),
            Some("https://shop.test")
        );
        assert_eq!(
            response.header_value("Access-Control-Allow-Methods"),
            Some(ALLOWED_METHODS)
        );
        assert_eq!(
            response.header_value("Access-Control-Allow-Headers"),
            Some(ALLOWED_HEADERS)
        );
        assert_eq!(
            response.header_value("Access-Control-Allow-Credentials"),
            Some("true")
        );
    }

    #[tokio::test]
    async fn preflight_short_circuits_with_204() {
        let hits = Arc::new(AtomicUsize::new(0));
        let middleware = CorsMiddleware::new(policy());

        let response = middleware
            .handle(
                testing::request(
                    "OPTIONS",
                    "/api/orders",
                    &[("origin", "https://admin.shop.test")],
                    "",
                ),
                counting_next(hits.clone()),
            )
            .await
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(response.status_code(), 204);
        assert!(response.body().is_empty());
        assert_eq!(
            response.header_value("Access-Control-Allow-Origin"),
            Some("https://admin.shop.test")
        );
    }

    #[tokio::test]
    async fn foreign_origin_is_rejected_before_downstream() {
        let hits = Arc::new(AtomicUsize::new(0));
        let middleware = CorsMiddleware::new(policy());

        let response = middleware
            .handle(
                testing::request("GET", "/api/users", &[("origin", "https://evil.test")], ""),
                counting_next(hits.clone()),
            )
            .await
            .unwrap_err();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(response.status_code(), 403);
        assert_eq!(response.header_value("Access-Control-Allow-Origin"), None);
        assert_eq!(
            response.json_body(),
            Some(serde_json::json!({ "message": "Not allowed by CORS" }))
        );
    }

    #[tokio::test]
    async fn error_responses_still_carry_headers() {
        let middleware = CorsMiddleware::new(policy());
        let failing = next_fn(|_request: Request| async {
            Err(HttpResponse::from(FrameworkError::NotFound))
        });

        let response = middleware
            .handle(testing::request("GET", "/nope", &[], ""), failing)
            .await
            .unwrap_err();

        assert_eq!(response.status_code(), 404);
        assert_eq!(
            response.header_value("Access-Control-Allow-Origin"),
            Some("https://shop.test")
        );
    }
}
