//! Request-scoped database context
//!
//! Every request gets its own [`DbScope`], opened by the database-context
//! middleware before routing and released when the last handle to it is
//! dropped. Release happens exactly once whatever the exit path: a normal
//! response, an error response, a handler panic, or a client disconnect that
//! drops the in-flight request future.

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::database::DbConnection;
use crate::error::FrameworkError;

tokio::task_local! {
    static CURRENT_SCOPE: DbScope;
}

/// Counters of opened and released scopes
#[derive(Debug, Default)]
pub struct ScopeStats {
    opened: AtomicU64,
    released: AtomicU64,
}

impl ScopeStats {
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Scopes opened but not yet released
    pub fn active(&self) -> u64 {
        self.opened().saturating_sub(self.released())
    }
}

/// Factory for request scopes over one connection pool
#[derive(Clone)]
pub struct DbContext {
    conn: DbConnection,
    stats: Arc<ScopeStats>,
    next_id: Arc<AtomicU64>,
}

impl DbContext {
    pub fn new(conn: DbConnection) -> Self {
        Self {
            conn,
            stats: Arc::new(ScopeStats::default()),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open a fresh scope; never shared between requests
    pub fn open_scope(&self) -> DbScope {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(scope_id = id, "database scope opened");

        DbScope {
            inner: Arc::new(ScopeInner {
                id,
                conn: self.conn.clone(),
                stats: self.stats.clone(),
            }),
        }
    }

    pub fn stats(&self) -> Arc<ScopeStats> {
        self.stats.clone()
    }

    pub fn connection(&self) -> &DbConnection {
        &self.conn
    }
}

/// Handle to one request's unit of work
///
/// Cloning shares the same scope; the scope is released when the last clone
/// is dropped.
#[derive(Clone)]
pub struct DbScope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    id: u64,
    conn: DbConnection,
    stats: Arc<ScopeStats>,
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(scope_id = self.id, "database scope released");
    }
}

impl DbScope {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Connection for reads and single-statement writes
    pub fn conn(&self) -> &DatabaseConnection {
        self.inner.conn.inner()
    }

    /// Start a transaction for work that must commit or roll back together
    ///
    /// Dropping the transaction without `commit()` rolls it back.
    pub async fn begin(&self) -> Result<DatabaseTransaction, FrameworkError> {
        Ok(self.conn().begin().await?)
    }

    /// Run a future with this scope installed as the task's current scope
    pub async fn enter<T, Fut>(self, fut: Fut) -> T
    where
        Fut: Future<Output = T>,
    {
        CURRENT_SCOPE.scope(self, fut).await
    }

    /// Scope of the request being handled by the current task, if any
    pub fn current() -> Option<DbScope> {
        CURRENT_SCOPE.try_with(|scope| scope.clone()).ok()
    }
}
