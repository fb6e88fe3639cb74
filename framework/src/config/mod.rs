//! Configuration module
//!
//! Provides:
//! - Automatic `.env` file loading with environment-based precedence
//! - Type-safe configuration structs read from environment variables
//! - [`Settings`], the process-wide configuration built once at startup and
//!   passed explicitly to the server and the route table
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront_kit::config::{Config, Settings};
//!
//! Config::init(std::path::Path::new("."));
//! let settings = Settings::from_env().expect("invalid configuration");
//! println!("Listening port: {}", settings.server.port);
//! ```

pub mod env;
pub mod providers;

pub use env::{env, env_list, env_optional, env_required, load_dotenv, Environment};
pub use providers::{
    AppConfig, AuthConfig, CorsConfig, ServerConfig, ServerConfigBuilder, UploadsConfig,
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_PORT, MIN_SECRET_LEN,
};

use crate::database::DatabaseConfig;
use crate::error::ConfigError;
use std::path::Path;

/// Configuration bootstrap facade
pub struct Config;

impl Config {
    /// Load `.env` files from the project root
    ///
    /// Call once at startup, before [`Settings::from_env`].
    /// Returns the detected environment.
    pub fn init(project_root: &Path) -> Environment {
        env::load_dotenv(project_root)
    }
}

/// Process-wide settings
///
/// Created once from the environment and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub uploads: UploadsConfig,
    pub database: DatabaseConfig,
}

impl Settings {
    /// Read every config section from environment variables
    ///
    /// Fails when a required variable (`SECRET_KEY`, `DATABASE_URL`) is missing
    /// or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            app: AppConfig::from_env(),
            server: ServerConfig::from_env(),
            cors: CorsConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            uploads: UploadsConfig::from_env(),
            database: DatabaseConfig::from_env()?,
        })
    }
}
