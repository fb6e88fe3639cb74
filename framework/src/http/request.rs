use super::body::{collect_body, is_json_content_type, parse_json, parse_query};
use crate::database::DbScope;
use crate::error::FrameworkError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use validator::Validate;

/// HTTP request as seen by middleware and handlers
///
/// The body is already collected. The JSON body stage stores the parsed
/// document, and the database-context stage attaches the request's
/// [`DbScope`].
pub struct Request {
    parts: http::request::Parts,
    body: Bytes,
    body_rejection: Option<FrameworkError>,
    params: HashMap<String, String>,
    json: Option<serde_json::Value>,
    db: Option<DbScope>,
}

impl Request {
    pub fn new(inner: http::Request<Bytes>) -> Self {
        let (parts, body) = inner.into_parts();
        Self {
            parts,
            body,
            body_rejection: None,
            params: HashMap::new(),
            json: None,
            db: None,
        }
    }

    /// Build from a hyper request, collecting at most `body_limit` bytes
    ///
    /// A body that cannot be read is not an error here; it is recorded and
    /// reported by the body-parsing stage so the response still goes through
    /// the middleware pipeline.
    pub async fn from_incoming(
        inner: hyper::Request<hyper::body::Incoming>,
        body_limit: usize,
    ) -> Self {
        let (parts, body) = inner.into_parts();
        let (body, body_rejection) = match collect_body(body, body_limit).await {
            Ok(bytes) => (bytes, None),
            Err(e) => (Bytes::new(), Some(e)),
        };
        Self {
            parts,
            body,
            body_rejection,
            params: HashMap::new(),
            json: None,
            db: None,
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &http::Method {
        &self.parts.method
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn uri(&self) -> &http::Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &http::HeaderMap {
        &self.parts.headers
    }

    /// Get a header value by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// The declared `Origin` of a cross-origin request
    pub fn origin(&self) -> Option<&str> {
        self.header("origin")
    }

    /// Get a route parameter by name (e.g., /api/products/{id})
    pub fn param(&self, name: &str) -> Result<&str, FrameworkError> {
        self.params
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| FrameworkError::param(name))
    }

    /// Get a route parameter parsed into `T`
    ///
    /// ```rust,ignore
    /// let id: i32 = req.param_as("id")?;
    /// ```
    pub fn param_as<T: std::str::FromStr>(&self, name: &str) -> Result<T, FrameworkError> {
        let raw = self.param(name)?;
        raw.parse()
            .map_err(|_| FrameworkError::param_parse(raw, std::any::type_name::<T>()))
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Whether the request declares a JSON body
    pub fn is_json(&self) -> bool {
        self.content_type().map(is_json_content_type).unwrap_or(false)
    }

    /// JSON document parsed by the body stage
    pub fn json_value(&self) -> Option<&serde_json::Value> {
        self.json.as_ref()
    }

    /// Deserialize the JSON body into `T`
    ///
    /// ```rust,ignore
    /// #[derive(Deserialize)]
    /// struct CreateCategory { name: String }
    ///
    /// pub async fn store(req: Request) -> Response {
    ///     let data: CreateCategory = req.json()?;
    ///     // ...
    /// }
    /// ```
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        match &self.json {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| FrameworkError::validation("body", e.to_string())),
            None if self.body.is_empty() => Err(FrameworkError::validation(
                "body",
                "a JSON request body is required",
            )),
            None => parse_json(&self.body),
        }
    }

    /// Deserialize the query string into `T`; no query reads as empty
    ///
    /// ```rust,ignore
    /// #[derive(Deserialize)]
    /// struct ProductFilter { category_id: Option<i32> }
    ///
    /// let filter: ProductFilter = req.query()?;
    /// ```
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        parse_query(self.uri().query().unwrap_or(""))
    }

    /// Deserialize the JSON body and run its `validator` rules
    pub fn validated<T: DeserializeOwned + Validate>(&self) -> Result<T, FrameworkError> {
        let data: T = self.json()?;
        data.validate()?;
        Ok(data)
    }

    /// The database scope opened for this request
    pub fn db(&self) -> Result<&DbScope, FrameworkError> {
        self.db
            .as_ref()
            .ok_or_else(|| FrameworkError::internal("No database scope attached to request"))
    }

    pub(crate) fn attach_db_scope(&mut self, scope: DbScope) {
        self.db = Some(scope);
    }

    pub(crate) fn set_json(&mut self, value: serde_json::Value) {
        self.json = Some(value);
    }

    pub(crate) fn take_body_rejection(&mut self) -> Option<FrameworkError> {
        self.body_rejection.take()
    }
}

#[cfg(test)]
mod tests {
    use crate::testing;
    use serde::Deserialize;
    use std::collections::HashMap;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct NewCategory {
        #[validate(length(min = 1, message = "name must not be empty"))]
        name: String,
    }

    #[test]
    fn param_as_parses_and_reports_bad_values() {
        let mut params = HashMap::new();
        params.insert("id".to_string(), "42".to_string());
        params.insert("slug".to_string(), "abc".to_string());
        let req = testing::request("GET", "/api/products/42", &[], "").with_params(params);

        assert_eq!(req.param_as::<i32>("id").unwrap(), 42);
        assert_eq!(req.param_as::<i32>("slug").unwrap_err().status_code(), 400);
        assert_eq!(req.param("missing").unwrap_err().status_code(), 400);
    }

    #[test]
    fn validated_runs_rules() {
        let req = testing::json_request(
            "POST",
            "/api/categories",
            serde_json::json!({ "name": "" }),
        );
        let err = req.validated::<NewCategory>().unwrap_err();
        assert_eq!(err.status_code(), 422);

        let req = testing::json_request(
            "POST",
            "/api/categories",
            serde_json::json!({ "name": "Tools" }),
        );
        assert_eq!(req.validated::<NewCategory>().unwrap().name, "Tools");
    }

    #[test]
    fn exposes_origin_and_json_detection() {
        let req = testing::request(
            "POST",
            "/api/auth/login",
            &[
                ("origin", "https://shop.test"),
                ("content-type", "application/json; charset=utf-8"),
            ],
            "{}",
        );
        assert_eq!(req.origin(), Some("https://shop.test"));
        assert!(req.is_json());
        assert!(req.db().is_err());
    }
}
