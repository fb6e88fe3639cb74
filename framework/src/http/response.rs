use crate::error::{FrameworkError, ValidationErrors};
use bytes::Bytes;
use http_body_util::Full;

/// HTTP response builder
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    body: Bytes,
    headers: Vec<(String, String)>,
}

/// Response type alias - allows using `?` operator for early returns
pub type Response = Result<HttpResponse, HttpResponse>;

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            status: 200,
            body: Bytes::new(),
            headers: Vec::new(),
        }
    }

    /// Create a response with a string body
    pub fn text(body: impl Into<String>) -> Self {
        Self::bytes(body.into(), "text/plain; charset=utf-8")
    }

    /// Create a JSON response from a serde_json::Value
    pub fn json(body: serde_json::Value) -> Self {
        Self::bytes(body.to_string(), "application/json")
    }

    /// Create a response with raw bytes and an explicit content type
    pub fn bytes(body: impl Into<Bytes>, content_type: &str) -> Self {
        Self {
            status: 200,
            body: body.into(),
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
        }
    }

    /// 204 with an empty body
    pub fn no_content() -> Self {
        Self::new().status(204)
    }

    /// Set the HTTP status code
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a header to the response
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a header, replacing any value already present under that name
    pub fn set_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Drop the body, keeping headers (HEAD requests)
    pub fn without_body(mut self) -> Self {
        self.body = Bytes::new();
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, case-insensitive
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Wrap this response in Ok() for use as Response type
    pub fn ok(self) -> Response {
        Ok(self)
    }

    /// Convert to hyper response
    ///
    /// A header that hyper refuses turns the whole response into a bare 500.
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let mut builder = hyper::Response::builder().status(self.status);

        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }

        builder.body(Full::new(self.body)).unwrap_or_else(|e| {
            tracing::error!(error = %e, "invalid response parts");
            let mut fallback = hyper::Response::new(Full::new(Bytes::from_static(
                b"{\"message\":\"Internal server error\"}",
            )));
            *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for Response to enable method chaining
pub trait ResponseExt {
    fn status(self, code: u16) -> Self;
    fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self;
}

impl ResponseExt for Response {
    fn status(self, code: u16) -> Self {
        self.map(|r| r.status(code))
    }

    fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map(|r| r.header(name, value))
    }
}

/// Auto-convert FrameworkError to HttpResponse
///
/// This enables using the `?` operator in controller handlers to propagate
/// framework errors as appropriate HTTP responses. Every body carries a
/// `message`; server errors are logged and their detail is not exposed.
impl From<FrameworkError> for HttpResponse {
    fn from(err: FrameworkError) -> HttpResponse {
        let status = err.status_code();
        let body = match &err {
            FrameworkError::Validation(errors) => errors.to_json(),
            FrameworkError::ValidationError { field, message } => {
                let mut errors = ValidationErrors::new();
                errors.add(field.clone(), message.clone());
                errors.to_json()
            }
            _ if err.is_server_error() => {
                tracing::error!(error = %err, "request failed");
                serde_json::json!({ "message": "Internal server error" })
            }
            _ => serde_json::json!({ "message": err.to_string() }),
        };
        HttpResponse::json(body).status(status)
    }
}

/// Auto-convert AppError to HttpResponse
impl From<crate::error::AppError> for HttpResponse {
    fn from(err: crate::error::AppError) -> HttpResponse {
        let framework_err: FrameworkError = err.into();
        framework_err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn not_found_error_renders_fallback_body() {
        let response = HttpResponse::from(FrameworkError::NotFound);
        assert_eq!(response.status_code(), 404);
        assert_eq!(
            response.json_body(),
            Some(serde_json::json!({ "message": "Resource not found!" }))
        );
        assert_eq!(response.header_value("content-type"), Some("application/json"));
    }

    #[test]
    fn server_errors_hide_details() {
        let response = HttpResponse::from(FrameworkError::database("relation missing"));
        assert_eq!(response.status_code(), 500);
        assert_eq!(
            response.json_body(),
            Some(serde_json::json!({ "message": "Internal server error" }))
        );
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let response = HttpResponse::new()
            .header("Vary", "Accept")
            .set_header("vary", "Origin");
        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.header_value("VARY"), Some("Origin"));
    }

    #[test]
    fn into_hyper_keeps_status_and_body() {
        let hyper_response = HttpResponse::text("hello").status(201).into_hyper();
        assert_eq!(hyper_response.status().as_u16(), 201);
    }
}
