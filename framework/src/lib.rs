pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod routing;
pub mod server;
pub mod static_files;
pub mod testing;

pub use app::{Application, ReadyContext};
pub use config::{Config, Environment, Settings};
pub use database::{DbConnection, DbContext, DbScope};
pub use error::{AppError, ConfigError, FrameworkError, HttpError, ValidationErrors};
pub use http::{json, json_status, text, HttpResponse, Request, Response, ResponseExt};
pub use middleware::{Middleware, Next};
pub use routing::{GroupRouter, Router};
pub use server::{BoundServer, Pipeline, Server};
pub use static_files::StaticFiles;

// Re-export for handler and middleware signatures
pub use async_trait::async_trait;
pub use serde_json;
