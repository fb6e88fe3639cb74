use crate::config::env::{env, env_required};
use crate::error::ConfigError;

/// Shortest accepted token signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 16;

/// Token signing configuration
///
/// There is no built-in fallback secret: SECRET_KEY must be provided.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens
    pub secret_key: String,
    /// Lifetime of issued tokens in seconds
    pub token_ttl_secs: i64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key: String = env_required("SECRET_KEY")?;
        Self::new(secret_key, env("TOKEN_TTL_SECS", 24 * 60 * 60))
    }

    pub fn new(secret_key: impl Into<String>, token_ttl_secs: i64) -> Result<Self, ConfigError> {
        let secret_key = secret_key.into();
        if secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid(
                "SECRET_KEY",
                format!("must be at least {} bytes long", MIN_SECRET_LEN),
            ));
        }
        if token_ttl_secs <= 0 {
            return Err(ConfigError::invalid("TOKEN_TTL_SECS", "must be positive"));
        }
        Ok(Self {
            secret_key,
            token_ttl_secs,
        })
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}
