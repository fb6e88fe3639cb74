//! Testing utilities
//!
//! - [`TestDatabase`]: isolated in-memory SQLite database per test
//! - [`request`]: build a [`Request`] without a socket
//! - [`settings`]: a complete [`Settings`] that does not read the environment

use crate::config::{AppConfig, AuthConfig, CorsConfig, ServerConfig, Settings, UploadsConfig};
use crate::database::{DatabaseConfig, DbConnection, DbContext};
use crate::http::Request;
use bytes::Bytes;
use std::path::PathBuf;

/// In-memory SQLite database for a single test
///
/// Uses one pooled connection so every statement sees the same memory
/// database.
///
/// ```rust,ignore
/// let db = TestDatabase::new().await;
/// create_table_if_missing(db.connection().inner(), category::Entity).await?;
/// ```
pub struct TestDatabase {
    conn: DbConnection,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let config = DatabaseConfig::builder()
            .url("sqlite::memory:")
            .max_connections(1)
            .min_connections(1)
            .build();
        let conn = DbConnection::connect(&config)
            .await
            .expect("in-memory sqlite database");
        Self { conn }
    }

    pub fn connection(&self) -> DbConnection {
        self.conn.clone()
    }

    pub fn context(&self) -> DbContext {
        DbContext::new(self.conn.clone())
    }
}

/// Build a request from method, path, headers and body
///
/// ```rust,ignore
/// let req = testing::request("POST", "/api/categories", &[("content-type", "application/json")], r#"{"name":"Tools"}"#);
/// ```
pub fn request(method: &str, path: &str, headers: &[(&str, &str)], body: &str) -> Request {
    let mut builder = http::Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let inner = builder
        .body(Bytes::from(body.to_string()))
        .expect("valid test request");
    Request::new(inner)
}

/// JSON request helper
pub fn json_request(method: &str, path: &str, body: serde_json::Value) -> Request {
    request(
        method,
        path,
        &[("content-type", "application/json")],
        &body.to_string(),
    )
}

/// Origin allowed by [`settings`]
pub const TEST_ORIGIN: &str = "http://localhost:5173";

/// Settings for tests: loopback host, ephemeral port, in-memory database
pub fn settings(uploads_dir: impl Into<PathBuf>) -> Settings {
    Settings {
        app: AppConfig::from_env(),
        server: ServerConfig::builder()
            .host("127.0.0.1")
            .port(0)
            .max_body_size(64 * 1024)
            .build(),
        cors: CorsConfig::parse(TEST_ORIGIN).expect("valid test origin"),
        auth: AuthConfig::new("storefront-testing-secret", 3600).expect("valid test secret"),
        uploads: UploadsConfig {
            dir: uploads_dir.into(),
            mount: "/uploads".to_string(),
        },
        database: DatabaseConfig::builder().url("sqlite::memory:").build(),
    }
}
