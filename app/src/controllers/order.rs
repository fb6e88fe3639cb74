use kit::{json, json_status, FrameworkError, GroupRouter, Request, Response};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use super::{deleted, id};
use crate::actions::place_order::{NewOrder, PlaceOrderAction};
use crate::models::{order, order_item};

#[derive(Debug, Deserialize, Validate)]
pub struct StatusChange {
    pub status: order::Status,
}

pub fn routes(r: GroupRouter) -> GroupRouter {
    r.get("/", index)
        .get("/{id}", show)
        .post("/", store)
        .patch("/{id}", update_status)
        .delete("/{id}", destroy)
}

async fn find(req: &Request) -> Result<order::Model, FrameworkError> {
    order::Entity::find_by_id(id(req)?)
        .one(req.db()?.conn())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("Order"))
}

/// Order fields with its lines under `items`
fn with_items(order: &order::Model, items: &[order_item::Model]) -> Value {
    let mut body = serde_json::json!(order);
    if let Value::Object(fields) = &mut body {
        fields.insert("items".to_string(), serde_json::json!(items));
    }
    body
}

pub async fn index(req: Request) -> Response {
    let orders = order::Entity::find()
        .order_by_desc(order::Column::Id)
        .all(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(orders))
}

pub async fn show(req: Request) -> Response {
    let order = find(&req).await?;
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .order_by_asc(order_item::Column::Id)
        .all(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(with_items(&order, &items))
}

pub async fn store(req: Request) -> Response {
    let payload: NewOrder = req.validated()?;
    let (order, items) = PlaceOrderAction.execute(req.db()?, payload).await?;
    json_status(201, with_items(&order, &items))
}

pub async fn update_status(req: Request) -> Response {
    let existing = find(&req).await?;
    let change: StatusChange = req.validated()?;
    let from = existing.status.clone();

    let mut active: order::ActiveModel = existing.into();
    active.status = Set(change.status.as_str().to_string());
    let order = active
        .update(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;

    tracing::info!(order_id = order.id, from = %from, to = %order.status, "order status changed");
    json(serde_json::json!(order))
}

/// Remove an order with its lines; stock is left as is
pub async fn destroy(req: Request) -> Response {
    let order = find(&req).await?;
    let txn = req.db()?.begin().await?;

    order_item::Entity::delete_many()
        .filter(order_item::Column::OrderId.eq(order.id))
        .exec(&txn)
        .await
        .map_err(FrameworkError::from)?;
    order::Entity::delete_by_id(order.id)
        .exec(&txn)
        .await
        .map_err(FrameworkError::from)?;
    txn.commit().await.map_err(FrameworkError::from)?;

    deleted("Order")
}
