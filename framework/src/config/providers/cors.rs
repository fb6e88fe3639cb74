use crate::config::env::{env_list, split_list};
use crate::error::ConfigError;

/// Origin allowed when ALLOWED_ORIGINS is unset
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// CORS configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CorsConfig {
    /// Allowed request origins, in order. The first entry is the default origin
    /// granted to requests that carry no `Origin` header. `"*"` allows any origin,
    /// without credentials.
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Build config from ALLOWED_ORIGINS (comma separated)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(env_list("ALLOWED_ORIGINS", &[DEFAULT_ALLOWED_ORIGIN]))
    }

    /// Parse a comma separated origin list
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Self::new(split_list(raw))
    }

    pub fn new(allowed_origins: Vec<String>) -> Result<Self, ConfigError> {
        if allowed_origins.is_empty() {
            return Err(ConfigError::invalid(
                "ALLOWED_ORIGINS",
                "at least one origin is required",
            ));
        }
        let allowed_origins = allowed_origins
            .into_iter()
            .map(|origin| origin.trim_end_matches('/').to_string())
            .collect();
        Ok(Self { allowed_origins })
    }

    /// Origin granted when the request does not declare one
    pub fn default_origin(&self) -> &str {
        &self.allowed_origins[0]
    }
}
