use crate::http::{Request, Response};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for route handlers
pub type BoxedHandler =
    Box<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

/// Box an async handler function
pub(crate) fn boxed_handler<H, Fut>(handler: H) -> Arc<BoxedHandler>
where
    H: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let handler: BoxedHandler = Box::new(move |req| Box::pin(handler(req)));
    Arc::new(handler)
}

/// Strip a trailing slash, keeping the root path intact
pub(crate) fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// Route table with one matcher per HTTP method
///
/// ```rust,ignore
/// Router::new()
///     .get("/api/health", health)
///     .group("/api/categories", |r| {
///         r.get("/", category::index)
///          .get("/{id}", category::show)
///          .post("/", category::store)
///     })
/// ```
pub struct Router {
    get_routes: MatchitRouter<Arc<BoxedHandler>>,
    post_routes: MatchitRouter<Arc<BoxedHandler>>,
    put_routes: MatchitRouter<Arc<BoxedHandler>>,
    patch_routes: MatchitRouter<Arc<BoxedHandler>>,
    delete_routes: MatchitRouter<Arc<BoxedHandler>>,
    registered: Vec<(http::Method, String)>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            get_routes: MatchitRouter::new(),
            post_routes: MatchitRouter::new(),
            put_routes: MatchitRouter::new(),
            patch_routes: MatchitRouter::new(),
            delete_routes: MatchitRouter::new(),
            registered: Vec::new(),
        }
    }

    fn table_mut(&mut self, method: &http::Method) -> Option<&mut MatchitRouter<Arc<BoxedHandler>>> {
        match *method {
            http::Method::GET => Some(&mut self.get_routes),
            http::Method::POST => Some(&mut self.post_routes),
            http::Method::PUT => Some(&mut self.put_routes),
            http::Method::PATCH => Some(&mut self.patch_routes),
            http::Method::DELETE => Some(&mut self.delete_routes),
            _ => None,
        }
    }

    fn table(&self, method: &http::Method) -> Option<&MatchitRouter<Arc<BoxedHandler>>> {
        match *method {
            http::Method::GET => Some(&self.get_routes),
            http::Method::POST => Some(&self.post_routes),
            http::Method::PUT => Some(&self.put_routes),
            http::Method::PATCH => Some(&self.patch_routes),
            http::Method::DELETE => Some(&self.delete_routes),
            _ => None,
        }
    }

    /// Insert a pre-boxed handler; a conflicting path is logged and skipped
    pub(crate) fn insert(&mut self, method: http::Method, path: &str, handler: Arc<BoxedHandler>) {
        let path = normalize_path(path).to_string();
        let Some(table) = self.table_mut(&method) else {
            tracing::error!(%method, path = %path, "unsupported route method");
            return;
        };
        match table.insert(path.clone(), handler) {
            Ok(()) => self.registered.push((method, path)),
            Err(e) => {
                tracing::error!(%method, path = %path, error = %e, "route registration rejected")
            }
        }
    }

    /// Register a GET route
    pub fn get<H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(http::Method::GET, path, boxed_handler(handler));
        self
    }

    /// Register a POST route
    pub fn post<H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(http::Method::POST, path, boxed_handler(handler));
        self
    }

    /// Register a PUT route
    pub fn put<H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(http::Method::PUT, path, boxed_handler(handler));
        self
    }

    /// Register a PATCH route
    pub fn patch<H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(http::Method::PATCH, path, boxed_handler(handler));
        self
    }

    /// Register a DELETE route
    pub fn delete<H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(http::Method::DELETE, path, boxed_handler(handler));
        self
    }

    /// Match a request and return the handler with extracted params
    pub fn match_route(
        &self,
        method: &http::Method,
        path: &str,
    ) -> Option<(Arc<BoxedHandler>, HashMap<String, String>)> {
        let table = self.table(method)?;

        table.at(normalize_path(path)).ok().map(|matched| {
            let params: HashMap<String, String> = matched
                .params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            (matched.value.clone(), params)
        })
    }

    /// Registered (method, path) pairs in registration order
    pub fn routes(&self) -> &[(http::Method, String)] {
        &self.registered
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::testing;

    async fn named(req: Request) -> Response {
        Ok(HttpResponse::text(req.path().to_string()))
    }

    #[test]
    fn matches_per_method_with_params() {
        let router = Router::new()
            .get("/api/products/{id}", named)
            .patch("/api/products/{id}", named);

        let (_, params) = router
            .match_route(&http::Method::GET, "/api/products/7")
            .unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("7"));
        assert!(router
            .match_route(&http::Method::PATCH, "/api/products/7")
            .is_some());
        assert!(router
            .match_route(&http::Method::POST, "/api/products/7")
            .is_none());
        assert!(router
            .match_route(&http::Method::OPTIONS, "/api/products/7")
            .is_none());
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let router = Router::new().get("/api/cities/", named);
        assert!(router.match_route(&http::Method::GET, "/api/cities").is_some());
        assert!(router.match_route(&http::Method::GET, "/api/cities/").is_some());
        assert_eq!(router.routes()[0].1, "/api/cities");
    }

    #[test]
    fn conflicting_route_keeps_first() {
        let router = Router::new()
            .get("/api/orders/{id}", named)
            .get("/api/orders/{order}", named);
        assert_eq!(router.routes().len(), 1);
    }

    #[tokio::test]
    async fn handler_receives_request() {
        let router = Router::new().get("/api/suppliers", named);
        let (handler, _) = router
            .match_route(&http::Method::GET, "/api/suppliers")
            .unwrap();
        let response = handler(testing::request("GET", "/api/suppliers", &[], ""))
            .await
            .unwrap();
        assert_eq!(response.body().as_ref(), b"/api/suppliers");
    }
}
