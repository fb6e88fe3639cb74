//! HTTP handlers, one module per resource
//!
//! Every resource module exposes `routes`, mounted under its `/api/...`
//! prefix by [`crate::routes::register`].

pub mod auth;
pub mod category;
pub mod city;
pub mod order;
pub mod product;
pub mod province;
pub mod supplier;
pub mod user;

use kit::{json, AppError, FrameworkError, Request, Response};
use sea_orm::{ConnectionTrait, EntityTrait, PrimaryKeyTrait};

/// The `{id}` route parameter
pub(crate) fn id(req: &Request) -> Result<i32, FrameworkError> {
    req.param_as("id")
}

/// Body of a successful DELETE
pub(crate) fn deleted(model: &str) -> Response {
    json(serde_json::json!({ "message": format!("{} deleted", model) }))
}

/// Fail with 422 unless a row with `id` exists in `E`
pub(crate) async fn ensure_exists<E, C>(db: &C, id: i32, label: &str) -> Result<(), FrameworkError>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    match E::find_by_id(id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(AppError::unprocessable(format!("{} {} does not exist", label, id)).into()),
    }
}
