//! Default administrator account

use chrono::Utc;
use kit::FrameworkError;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};

use crate::actions::password;
use crate::config::AdminConfig;
use crate::models::user::{self, Role};

#[derive(Debug, PartialEq)]
pub enum SeedOutcome {
    Created { id: i32 },
    AlreadyPresent,
}

/// Ensure the administrator from [`AdminConfig`] exists
///
/// Idempotent: a user with the configured email, whatever its role, counts
/// as present and is left untouched.
pub struct SeedAdminAction {
    config: AdminConfig,
}

impl SeedAdminAction {
    pub fn new(config: AdminConfig) -> Self {
        Self { config }
    }

    pub async fn execute<C: ConnectionTrait>(&self, db: &C) -> Result<SeedOutcome, FrameworkError> {
        if user::Entity::find_by_email(db, &self.config.email)
            .await?
            .is_some()
        {
            tracing::debug!(email = %self.config.email, "administrator already present");
            return Ok(SeedOutcome::AlreadyPresent);
        }

        let (plain, generated) = match &self.config.password {
            Some(password) => (password.clone(), false),
            None => (random_password(), true),
        };

        let admin = user::ActiveModel {
            name: Set(self.config.name.clone()),
            email: Set(self.config.email.clone()),
            password: Set(password::hash(plain.clone()).await?),
            role: Set(Role::Admin.as_str().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        if generated {
            tracing::warn!(
                email = %admin.email,
                password = %plain,
                "created administrator with a generated password; set ADMIN_PASSWORD or change it"
            );
        } else {
            tracing::info!(email = %admin.email, "created administrator");
        }

        Ok(SeedOutcome::Created { id: admin.id })
    }
}

fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kit::testing::TestDatabase;
    use sea_orm::{EntityTrait, PaginatorTrait};

    fn config(password: Option<&str>) -> AdminConfig {
        AdminConfig {
            email: "root@shop.test".to_string(),
            name: "Root".to_string(),
            password: password.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn seeding_twice_creates_one_admin() {
        let db = TestDatabase::new().await;
        crate::models::sync(db.connection()).await.unwrap();
        let conn = db.connection();
        let action = SeedAdminAction::new(config(Some("s3cret-pass")));

        let first = action.execute(conn.inner()).await.unwrap();
        let second = action.execute(conn.inner()).await.unwrap();

        assert!(matches!(first, SeedOutcome::Created { .. }));
        assert_eq!(second, SeedOutcome::AlreadyPresent);
        assert_eq!(user::Entity::find().count(conn.inner()).await.unwrap(), 1);

        let admin = user::Entity::find_by_email(conn.inner(), "root@shop.test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, "admin");
        assert!(password::verify("s3cret-pass".to_string(), admin.password)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn generates_password_when_unset() {
        let db = TestDatabase::new().await;
        crate::models::sync(db.connection()).await.unwrap();

        let outcome = SeedAdminAction::new(config(None))
            .execute(db.connection().inner())
            .await
            .unwrap();
        assert!(matches!(outcome, SeedOutcome::Created { .. }));
        assert_eq!(random_password().len(), 20);
    }
}
