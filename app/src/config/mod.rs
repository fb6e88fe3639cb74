//! Application configuration beyond the framework's [`kit::Settings`]

use kit::config::{env, env_optional};

/// Default administrator account ensured at startup
///
/// ```env
/// ADMIN_EMAIL=admin@storefront.local
/// ADMIN_NAME=Administrator
/// # Optional; a random password is generated and logged once when unset
/// ADMIN_PASSWORD=
/// ```
#[derive(Clone)]
pub struct AdminConfig {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
}

impl AdminConfig {
    pub fn from_env() -> Self {
        Self {
            email: env("ADMIN_EMAIL", "admin@storefront.local".to_string()),
            name: env("ADMIN_NAME", "Administrator".to_string()),
            password: env_optional::<String>("ADMIN_PASSWORD").filter(|p| !p.is_empty()),
        }
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
