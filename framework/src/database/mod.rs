//! Database module
//!
//! SeaORM-backed connection pool plus the request-scoped unit of work.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use kit::database::{DbConnection, DbContext};
//!
//! // 1. Connect once at startup
//! let conn = DbConnection::connect(&settings.database).await?;
//!
//! // 2. The database-context middleware opens one scope per request
//! let context = DbContext::new(conn);
//!
//! // 3. Handlers use the scope of their request
//! pub async fn index(req: Request) -> Response {
//!     let categories = category::Entity::find().all(req.db()?.conn()).await?;
//!     ...
//! }
//! ```

pub mod config;
pub mod connection;
pub mod schema;
pub mod scope;

pub use config::{DatabaseConfig, DatabaseConfigBuilder, DatabaseType};
pub use connection::DbConnection;
pub use schema::create_table_if_missing;
pub use scope::{DbContext, DbScope, ScopeStats};

// Re-export sea_orm so applications use the framework's version
pub use sea_orm;
