//! Route grouping with a shared prefix

use super::router::{boxed_handler, BoxedHandler, Router};
use crate::http::{Request, Response};
use std::future::Future;
use std::sync::Arc;

/// A route registered within a group
struct GroupRoute {
    method: http::Method,
    path: String,
    handler: Arc<BoxedHandler>,
}

/// Inner router used within a group closure
///
/// Captures routes relative to the group prefix; they are merged into the
/// outer router once the closure returns. A route at `"/"` maps to the bare
/// prefix.
#[derive(Default)]
pub struct GroupRouter {
    routes: Vec<GroupRoute>,
}

impl GroupRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push<H, Fut>(mut self, method: http::Method, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.routes.push(GroupRoute {
            method,
            path: path.to_string(),
            handler: boxed_handler(handler),
        });
        self
    }

    pub fn get<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.push(http::Method::GET, path, handler)
    }

    pub fn post<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.push(http::Method::POST, path, handler)
    }

    pub fn put<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.push(http::Method::PUT, path, handler)
    }

    pub fn patch<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.push(http::Method::PATCH, path, handler)
    }

    pub fn delete<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.push(http::Method::DELETE, path, handler)
    }

    /// Register the same handler for PUT and PATCH
    pub fn update<H, Fut>(self, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.put(path, handler.clone()).patch(path, handler)
    }
}

fn join(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match path.trim_start_matches('/') {
        "" => prefix.to_string(),
        rest => format!("{}/{}", prefix, rest),
    }
}

impl Router {
    /// Mount a group of routes under a shared prefix
    ///
    /// ```rust,ignore
    /// Router::new()
    ///     .group("/api/provinces", |r| {
    ///         r.get("/", province::index)       // -> GET /api/provinces
    ///          .get("/{id}", province::show)    // -> GET /api/provinces/{id}
    ///     })
    /// ```
    pub fn group<F>(mut self, prefix: &str, builder_fn: F) -> Self
    where
        F: FnOnce(GroupRouter) -> GroupRouter,
    {
        let built = builder_fn(GroupRouter::new());
        for route in built.routes {
            let full_path = join(prefix, &route.path);
            self.insert(route.method, &full_path, route.handler);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;

    async fn ok(_req: Request) -> Response {
        Ok(HttpResponse::no_content())
    }

    #[test]
    fn root_route_maps_to_bare_prefix() {
        let router = Router::new().group("/api/categories", |r| {
            r.get("/", ok).get("/{id}", ok).update("/{id}", ok)
        });

        assert!(router
            .match_route(&http::Method::GET, "/api/categories")
            .is_some());
        assert!(router
            .match_route(&http::Method::GET, "/api/categories/")
            .is_some());
        assert!(router
            .match_route(&http::Method::PUT, "/api/categories/3")
            .is_some());
        assert!(router
            .match_route(&http::Method::PATCH, "/api/categories/3")
            .is_some());
        assert!(router
            .match_route(&http::Method::GET, "/api/categoriesx")
            .is_none());
    }

    #[test]
    fn joins_prefix_and_path() {
        assert_eq!(join("/api/auth", "/login"), "/api/auth/login");
        assert_eq!(join("/api/auth/", "login"), "/api/auth/login");
        assert_eq!(join("/api/auth", "/"), "/api/auth");
    }
}
