//! Table creation from entity definitions
//!
//! Creates the tables of registered entities when they do not exist yet.
//! Column changes on existing tables are out of scope; use a migration tool
//! for those.

use sea_orm::{ConnectionTrait, EntityName, EntityTrait, Schema};

use crate::error::FrameworkError;

/// Issue `CREATE TABLE IF NOT EXISTS` for one entity
///
/// ```rust,ignore
/// create_table_if_missing(db.inner(), category::Entity).await?;
/// ```
pub async fn create_table_if_missing<C, E>(db: &C, entity: E) -> Result<(), FrameworkError>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();

    db.execute(backend.build(&statement)).await?;
    tracing::debug!(table = entity.table_name(), "table ensured");
    Ok(())
}
