//! Middleware pipeline
//!
//! A middleware receives the request and the rest of the pipeline as `next`.
//! It either calls `next(request).await` and may decorate the response, or
//! short-circuits by returning a response itself; stages after it then never run.
//!
//! ```rust,ignore
//! use kit::{async_trait, Middleware, Next, Request, Response};
//!
//! pub struct TimingMiddleware;
//!
//! #[async_trait]
//! impl Middleware for TimingMiddleware {
//!     async fn handle(&self, request: Request, next: Next) -> Response {
//!         let started = std::time::Instant::now();
//!         let response = next(request).await;
//!         tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64);
//!         response
//!     }
//! }
//! ```

mod cors;
mod db_context;
mod json_body;
mod registry;

pub use cors::{CorsDecision, CorsMiddleware, CorsPolicy};
pub use db_context::DatabaseContextMiddleware;
pub use json_body::JsonBodyMiddleware;
pub use registry::MiddlewareRegistry;

use crate::http::{Request, Response};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The remainder of the pipeline, callable as `next(request).await`
pub type Next = Arc<dyn Fn(Request) -> BoxedResponseFuture + Send + Sync>;

/// Boxed future produced by a [`Next`]
pub type BoxedResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Wrap an async function as a [`Next`]
pub fn next_fn<F, Fut>(f: F) -> Next
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |request: Request| -> BoxedResponseFuture { Box::pin(f(request)) })
}

/// A pipeline stage
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: Request, next: Next) -> Response;
}

/// Type-erased, shareable middleware
pub type BoxedMiddleware = Arc<dyn Middleware>;

pub fn into_boxed<M: Middleware + 'static>(middleware: M) -> BoxedMiddleware {
    Arc::new(middleware)
}

/// Ordered middleware wrapped around a terminal endpoint
#[derive(Default)]
pub struct MiddlewareChain {
    middleware: Vec<BoxedMiddleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: BoxedMiddleware) {
        self.middleware.push(middleware);
    }

    pub fn extend(&mut self, middleware: impl IntoIterator<Item = BoxedMiddleware>) {
        self.middleware.extend(middleware);
    }

    /// Run the request through every middleware, in order, then `endpoint`
    pub async fn execute(self, request: Request, endpoint: Next) -> Response {
        let mut next = endpoint;
        for middleware in self.middleware.into_iter().rev() {
            let inner = next.clone();
            next = Arc::new(move |request: Request| -> BoxedResponseFuture {
                let middleware = middleware.clone();
                let inner = inner.clone();
                Box::pin(async move { middleware.handle(request, inner).await })
            });
        }
        next(request).await
    }
}
