use kit::{json, json_status, AppError, FrameworkError, GroupRouter, Request, Response};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use validator::Validate;

use super::{deleted, id};
use crate::models::{product, supplier};

#[derive(Debug, Deserialize, Validate)]
pub struct SupplierPayload {
    #[validate(length(min = 1, max = 150, message = "name must be 1 to 150 characters"))]
    pub name: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(max = 30, message = "phone is too long"))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SupplierChanges {
    #[validate(length(min = 1, max = 150, message = "name must be 1 to 150 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 30, message = "phone is too long"))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

pub fn routes(r: GroupRouter) -> GroupRouter {
    r.get("/", index)
        .get("/{id}", show)
        .post("/", store)
        .update("/{id}", update)
        .delete("/{id}", destroy)
}

async fn find(req: &Request) -> Result<supplier::Model, FrameworkError> {
    supplier::Entity::find_by_id(id(req)?)
        .one(req.db()?.conn())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("Supplier"))
}

pub async fn index(req: Request) -> Response {
    let suppliers = supplier::Entity::find()
        .order_by_asc(supplier::Column::Name)
        .all(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(suppliers))
}

pub async fn show(req: Request) -> Response {
    json(serde_json::json!(find(&req).await?))
}

pub async fn store(req: Request) -> Response {
    let payload: SupplierPayload = req.validated()?;

    let supplier = supplier::ActiveModel {
        name: Set(payload.name),
        email: Set(payload.email),
        phone: Set(payload.phone),
        address: Set(payload.address),
        ..Default::default()
    }
    .insert(req.db()?.conn())
    .await
    .map_err(FrameworkError::from)?;

    json_status(201, serde_json::json!(supplier))
}

pub async fn update(req: Request) -> Response {
    let existing = find(&req).await?;
    let changes: SupplierChanges = req.validated()?;

    let mut active: supplier::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(email) = changes.email {
        active.email = Set(email);
    }
    if let Some(phone) = changes.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(address) = changes.address {
        active.address = Set(Some(address));
    }

    let supplier = active
        .update(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(supplier))
}

pub async fn destroy(req: Request) -> Response {
    let supplier = find(&req).await?;
    let db = req.db()?.conn();

    let supplied = product::Entity::find()
        .filter(product::Column::SupplierId.eq(supplier.id))
        .count(db)
        .await
        .map_err(FrameworkError::from)?;
    if supplied > 0 {
        return Err(AppError::conflict("Supplier still has products").into());
    }

    supplier::Entity::delete_by_id(supplier.id)
        .exec(db)
        .await
        .map_err(FrameworkError::from)?;
    deleted("Supplier")
}
