//! Access tokens

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use kit::config::AuthConfig;
use kit::FrameworkError;
use serde::{Deserialize, Serialize};

use crate::models::user;

/// JWT claims of an access token
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issue an HS256 token for `user`
pub fn issue(user: &user::Model, auth: &AuthConfig) -> Result<String, FrameworkError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role.clone(),
        iat: now,
        exp: now + auth.token_ttl_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret_key.as_bytes()),
    )
    .map_err(|e| FrameworkError::internal(format!("cannot sign token: {}", e)))
}
