mod app;
mod auth;
mod cors;
mod server;
mod uploads;

pub use app::AppConfig;
pub use auth::{AuthConfig, MIN_SECRET_LEN};
pub use cors::{CorsConfig, DEFAULT_ALLOWED_ORIGIN};
pub use server::{ServerConfig, ServerConfigBuilder, DEFAULT_PORT};
pub use uploads::UploadsConfig;
