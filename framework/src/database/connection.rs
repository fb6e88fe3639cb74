//! Database connection management

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::database::config::DatabaseConfig;
use crate::error::FrameworkError;

/// Wrapper around SeaORM's DatabaseConnection
///
/// A clonable, thread-safe handle to the connection pool shared by every
/// request scope.
///
/// ```rust,ignore
/// let conn = DbConnection::connect(&settings.database).await?;
/// let categories = category::Entity::find().all(conn.inner()).await?;
/// ```
#[derive(Clone)]
pub struct DbConnection {
    inner: Arc<DatabaseConnection>,
}

impl DbConnection {
    /// Create a new connection pool from config
    ///
    /// For SQLite file databases the file and its parent directories are
    /// created when missing.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, FrameworkError> {
        let url = prepare_sqlite_url(&config.url)?;

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .sqlx_logging(config.logging);

        let conn = Database::connect(opt)
            .await
            .map_err(|e| FrameworkError::database(e.to_string()))?;

        tracing::info!(backend = ?conn.get_database_backend(), "database connected");

        Ok(Self::from_inner(conn))
    }

    /// Wrap an already established SeaORM connection
    pub fn from_inner(conn: DatabaseConnection) -> Self {
        Self {
            inner: Arc::new(conn),
        }
    }

    /// Get a reference to the underlying SeaORM connection
    pub fn inner(&self) -> &DatabaseConnection {
        &self.inner
    }
}

fn prepare_sqlite_url(url: &str) -> Result<String, FrameworkError> {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return Ok(url.to_string());
    };
    let path = path.trim_start_matches("./");
    if path.starts_with(":memory:") {
        return Ok(format!("sqlite:{}", path));
    }
    let path = path.split('?').next().unwrap_or(path);

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FrameworkError::database(format!(
                    "Cannot create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(format!("sqlite:{}?mode=rwc", path))
}

impl AsRef<DatabaseConnection> for DbConnection {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.inner
    }
}

impl std::ops::Deref for DbConnection {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_urls_get_create_mode() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("shop.db");
        let url = format!("sqlite://{}", db_path.display());

        let prepared = prepare_sqlite_url(&url).unwrap();

        assert!(prepared.ends_with("?mode=rwc"));
        assert!(db_path.parent().unwrap().exists());
    }

    #[test]
    fn memory_and_postgres_urls_pass_through() {
        assert_eq!(
            prepare_sqlite_url("sqlite://:memory:").unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            prepare_sqlite_url("postgres://u:p@db/shop").unwrap(),
            "postgres://u:p@db/shop"
        );
        assert_eq!(prepare_sqlite_url("sqlite::memory:").unwrap(), "sqlite::memory:");
    }
}
