use super::{Middleware, Next};
use crate::database::DbContext;
use crate::http::{Request, Response};
use async_trait::async_trait;

/// Opens one database scope per request
///
/// The scope is attached to the request (`req.db()`) and installed as the
/// task's current scope (`DbScope::current()`) for everything downstream.
/// It is released when the request and every handle to it are dropped,
/// which also covers error responses and abandoned requests.
pub struct DatabaseContextMiddleware {
    context: DbContext,
}

impl DatabaseContextMiddleware {
    pub fn new(context: DbContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Middleware for DatabaseContextMiddleware {
    async fn handle(&self, mut request: Request, next: Next) -> Response {
        let scope = self.context.open_scope();
        request.attach_db_scope(scope.clone());
        scope.enter(next(request)).await
    }
}
