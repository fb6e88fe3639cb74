//! In-process application for handler tests

use kit::testing::{self, TestDatabase};
use kit::{HttpResponse, Pipeline, Server};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

use crate::{models, routes};

/// Full pipeline over a fresh in-memory database
pub struct TestApp {
    pub db: TestDatabase,
    pipeline: Pipeline,
    catalogs: AtomicU32,
    _uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = TestDatabase::new().await;
        models::sync(db.connection()).await.unwrap();

        let uploads = TempDir::new().unwrap();
        let settings = testing::settings(uploads.path());
        let pipeline =
            Server::from_settings(routes::register(&settings), &settings, db.connection())
                .pipeline();

        Self {
            db,
            pipeline,
            catalogs: AtomicU32::new(0),
            _uploads: uploads,
        }
    }

    /// Request without a body
    pub async fn call(&self, method: &str, path: &str) -> HttpResponse {
        self.pipeline
            .dispatch(testing::request(method, path, &[], ""))
            .await
    }

    /// Request with a JSON body
    pub async fn send(&self, method: &str, path: &str, body: Value) -> HttpResponse {
        self.pipeline
            .dispatch(testing::json_request(method, path, body))
            .await
    }

    /// Create a category and a supplier, returning their ids
    pub async fn catalog(&self) -> (i64, i64) {
        let n = self.catalogs.fetch_add(1, Ordering::SeqCst);
        let category = self
            .send("POST", "/api/categories", json!({ "name": format!("Category {}", n) }))
            .await;
        let supplier = self
            .send(
                "POST",
                "/api/suppliers",
                json!({ "name": format!("Supplier {}", n), "email": format!("supplier{}@shop.test", n) }),
            )
            .await;
        (
            category.json_body().unwrap()["id"].as_i64().unwrap(),
            supplier.json_body().unwrap()["id"].as_i64().unwrap(),
        )
    }
}
