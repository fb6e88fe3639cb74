//! One-time startup work, run once the listener is bound

use kit::{FrameworkError, ReadyContext};

use crate::actions::seed_admin::{SeedAdminAction, SeedOutcome};
use crate::config::AdminConfig;

/// Ensure the default administrator account exists
pub async fn ready(ctx: ReadyContext) -> Result<(), FrameworkError> {
    let admin = AdminConfig::from_env();
    tracing::debug!(?admin, "seeding administrator");

    match SeedAdminAction::new(admin).execute(ctx.db.inner()).await? {
        SeedOutcome::Created { id } => tracing::info!(user_id = id, "administrator created"),
        SeedOutcome::AlreadyPresent => tracing::debug!("administrator already present"),
    }
    Ok(())
}
