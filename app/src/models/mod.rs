//! SeaORM entities of the storefront

pub mod category;
pub mod city;
pub mod order;
pub mod order_item;
pub mod product;
pub mod province;
pub mod supplier;
pub mod user;

use kit::database::create_table_if_missing;
use kit::{DbConnection, FrameworkError};

/// Create every missing table
pub async fn sync(db: DbConnection) -> Result<(), FrameworkError> {
    let conn = db.inner();
    create_table_if_missing(conn, category::Entity).await?;
    create_table_if_missing(conn, supplier::Entity).await?;
    create_table_if_missing(conn, province::Entity).await?;
    create_table_if_missing(conn, city::Entity).await?;
    create_table_if_missing(conn, user::Entity).await?;
    create_table_if_missing(conn, product::Entity).await?;
    create_table_if_missing(conn, order::Entity).await?;
    create_table_if_missing(conn, order_item::Entity).await?;
    Ok(())
}
