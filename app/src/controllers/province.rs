use kit::{json, json_status, AppError, FrameworkError, GroupRouter, Request, Response};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use validator::Validate;

use super::{deleted, id};
use crate::models::{city, province};

#[derive(Debug, Deserialize, Validate)]
pub struct ProvincePayload {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
}

pub fn routes(r: GroupRouter) -> GroupRouter {
    r.get("/", index)
        .get("/{id}", show)
        .get("/{id}/cities", cities)
        .post("/", store)
        .update("/{id}", update)
        .delete("/{id}", destroy)
}

async fn find(req: &Request) -> Result<province::Model, FrameworkError> {
    province::Entity::find_by_id(id(req)?)
        .one(req.db()?.conn())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("Province"))
}

async fn ensure_unique(req: &Request, name: &str) -> Result<(), FrameworkError> {
    let taken = province::Entity::find()
        .filter(province::Column::Name.eq(name))
        .count(req.db()?.conn())
        .await?;
    if taken > 0 {
        return Err(AppError::conflict("Province name already exists").into());
    }
    Ok(())
}

pub async fn index(req: Request) -> Response {
    let provinces = province::Entity::find()
        .order_by_asc(province::Column::Name)
        .all(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(provinces))
}

pub async fn show(req: Request) -> Response {
    json(serde_json::json!(find(&req).await?))
}

/// Cities of one province
pub async fn cities(req: Request) -> Response {
    let province = find(&req).await?;
    let cities = city::Entity::find()
        .filter(city::Column::ProvinceId.eq(province.id))
        .order_by_asc(city::Column::Name)
        .all(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(cities))
}

pub async fn store(req: Request) -> Response {
    let payload: ProvincePayload = req.validated()?;
    ensure_unique(&req, &payload.name).await?;

    let province = province::ActiveModel {
        name: Set(payload.name),
        ..Default::default()
    }
    .insert(req.db()?.conn())
    .await
    .map_err(FrameworkError::from)?;

    json_status(201, serde_json::json!(province))
}

pub async fn update(req: Request) -> Response {
    let existing = find(&req).await?;
    let payload: ProvincePayload = req.validated()?;
    if payload.name != existing.name {
        ensure_unique(&req, &payload.name).await?;
    }

    let mut active: province::ActiveModel = existing.into();
    active.name = Set(payload.name);
    let province = active
        .update(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(province))
}

pub async fn destroy(req: Request) -> Response {
    let province = find(&req).await?;
    let db = req.db()?.conn();

    let cities = city::Entity::find()
        .filter(city::Column::ProvinceId.eq(province.id))
        .count(db)
        .await
        .map_err(FrameworkError::from)?;
    if cities > 0 {
        return Err(AppError::conflict("Province still has cities").into());
    }

    province::Entity::delete_by_id(province.id)
        .exec(db)
        .await
        .map_err(FrameworkError::from)?;
    deleted("Province")
}
