//! Middleware registry for global middleware

use super::{into_boxed, BoxedMiddleware, Middleware};

/// Ordered list of middleware that runs on every request
///
/// # Example
///
/// ```rust,ignore
/// Server::new(router)
///     .middleware(CorsMiddleware::new(policy))   // runs first
///     .middleware(JsonBodyMiddleware)
///     .run()
///     .await;
/// ```
#[derive(Default, Clone)]
pub struct MiddlewareRegistry {
    /// Middleware that runs on every request (in order)
    global: Vec<BoxedMiddleware>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append global middleware; runs after everything appended before it
    pub fn append<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.global.push(into_boxed(middleware));
        self
    }

    pub fn global_middleware(&self) -> &[BoxedMiddleware] {
        &self.global
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }
}
