use kit::{json, json_status, AppError, FrameworkError, GroupRouter, Request, Response};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use validator::Validate;

use super::{deleted, id};
use crate::models::{category, product};

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryPayload {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryChanges {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

pub fn routes(r: GroupRouter) -> GroupRouter {
    r.get("/", index)
        .get("/{id}", show)
        .post("/", store)
        .update("/{id}", update)
        .delete("/{id}", destroy)
}

async fn find(req: &Request) -> Result<category::Model, FrameworkError> {
    category::Entity::find_by_id(id(req)?)
        .one(req.db()?.conn())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("Category"))
}

async fn name_taken(req: &Request, name: &str, except: Option<i32>) -> Result<bool, FrameworkError> {
    let mut query = category::Entity::find().filter(category::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(category::Column::Id.ne(id));
    }
    Ok(query.count(req.db()?.conn()).await? > 0)
}

pub async fn index(req: Request) -> Response {
    let categories = category::Entity::find()
        .order_by_asc(category::Column::Id)
        .all(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(categories))
}

pub async fn show(req: Request) -> Response {
    let category = find(&req).await?;
    json(serde_json::json!(category))
}

pub async fn store(req: Request) -> Response {
    let payload: CategoryPayload = req.validated()?;
    if name_taken(&req, &payload.name, None).await? {
        return Err(AppError::conflict("Category name already exists").into());
    }

    let category = category::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        ..Default::default()
    }
    .insert(req.db()?.conn())
    .await
    .map_err(FrameworkError::from)?;

    json_status(201, serde_json::json!(category))
}

pub async fn update(req: Request) -> Response {
    let existing = find(&req).await?;
    let changes: CategoryChanges = req.validated()?;

    let mut active: category::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        if name_taken(&req, &name, Some(id(&req)?)).await? {
            return Err(AppError::conflict("Category name already exists").into());
        }
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(Some(description));
    }

    let category = active
        .update(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(category))
}

pub async fn destroy(req: Request) -> Response {
    let category = find(&req).await?;
    let db = req.db()?.conn();

    let in_use = product::Entity::find()
        .filter(product::Column::CategoryId.eq(category.id))
        .count(db)
        .await
        .map_err(FrameworkError::from)?;
    if in_use > 0 {
        return Err(AppError::conflict("Category still has products").into());
    }

    category::Entity::delete_by_id(category.id)
        .exec(db)
        .await
        .map_err(FrameworkError::from)?;
    deleted("Category")
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn crud_lifecycle() {
        let app = TestApp::new().await;

        let created = app
            .send("POST", "/api/categories", json!({ "name": "Garden", "description": "Outdoor" }))
            .await;
        assert_eq!(created.status_code(), 201);
        let id = created.json_body().unwrap()["id"].as_i64().unwrap();

        let listed = app.call("GET", "/api/categories/").await;
        assert_eq!(listed.json_body().unwrap().as_array().unwrap().len(), 1);

        let renamed = app
            .send("PATCH", &format!("/api/categories/{}", id), json!({ "name": "Yard" }))
            .await;
        assert_eq!(renamed.json_body().unwrap()["name"], "Yard");
        assert_eq!(renamed.json_body().unwrap()["description"], "Outdoor");

        let removed = app.call("DELETE", &format!("/api/categories/{}", id)).await;
        assert_eq!(
            removed.json_body(),
            Some(json!({ "message": "Category deleted" }))
        );

        let gone = app.call("GET", &format!("/api/categories/{}", id)).await;
        assert_eq!(gone.status_code(), 404);
        assert_eq!(gone.json_body(), Some(json!({ "message": "Category not found" })));
    }

    #[tokio::test]
    async fn rejects_invalid_and_duplicate_names() {
        let app = TestApp::new().await;

        let invalid = app.send("POST", "/api/categories", json!({ "name": "" })).await;
        assert_eq!(invalid.status_code(), 422);
        assert!(invalid.json_body().unwrap()["errors"]["name"].is_array());

        app.send("POST", "/api/categories", json!({ "name": "Tools" })).await;
        let duplicate = app.send("POST", "/api/categories", json!({ "name": "Tools" })).await;
        assert_eq!(duplicate.status_code(), 409);

        let bad_id = app.call("GET", "/api/categories/abc").await;
        assert_eq!(bad_id.status_code(), 400);
    }
}
