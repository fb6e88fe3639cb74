use super::{Middleware, Next};
use crate::http::{parse_json, Request, Response};
use async_trait::async_trait;

/// Parses JSON request bodies before routing
///
/// Bodies that could not be read (oversize, broken stream) and JSON bodies
/// that do not parse are rejected here; handlers only ever see a parsed
/// document. Requests without a JSON content type pass through untouched.
pub struct JsonBodyMiddleware;

#[async_trait]
impl Middleware for JsonBodyMiddleware {
    async fn handle(&self, mut request: Request, next: Next) -> Response {
        if let Some(rejection) = request.take_body_rejection() {
            tracing::warn!(path = request.path(), error = %rejection, "request body rejected");
            return Err(rejection.into());
        }

        if request.is_json() && !request.body_bytes().is_empty() {
            match parse_json::<serde_json::Value>(request.body_bytes()) {
                Ok(value) => request.set_json(value),
                Err(e) => {
                    tracing::warn!(path = request.path(), error = %e, "malformed JSON body");
                    return Err(e.into());
                }
            }
        }

        next(request).await
    }
}
