use kit::{json, json_status, FrameworkError, GroupRouter, Request, Response};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use validator::Validate;

use super::{deleted, ensure_exists, id};
use crate::models::{city, province};

#[derive(Debug, Deserialize, Validate)]
pub struct CityPayload {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 3, max = 10, message = "zip_code must be 3 to 10 characters"))]
    pub zip_code: String,
    pub province_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CityChanges {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 10, message = "zip_code must be 3 to 10 characters"))]
    pub zip_code: Option<String>,
    pub province_id: Option<i32>,
}

pub fn routes(r: GroupRouter) -> GroupRouter {
    r.get("/", index)
        .get("/{id}", show)
        .post("/", store)
        .update("/{id}", update)
        .delete("/{id}", destroy)
}

async fn find(req: &Request) -> Result<city::Model, FrameworkError> {
    city::Entity::find_by_id(id(req)?)
        .one(req.db()?.conn())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("City"))
}

pub async fn index(req: Request) -> Response {
    let cities = city::Entity::find()
        .order_by_asc(city::Column::Name)
        .all(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(cities))
}

pub async fn show(req: Request) -> Response {
    json(serde_json::json!(find(&req).await?))
}

pub async fn store(req: Request) -> Response {
    let payload: CityPayload = req.validated()?;
    let db = req.db()?.conn();
    ensure_exists::<province::Entity, _>(db, payload.province_id, "Province").await?;

    let city = city::ActiveModel {
        name: Set(payload.name),
        zip_code: Set(payload.zip_code),
        province_id: Set(payload.province_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(FrameworkError::from)?;

    json_status(201, serde_json::json!(city))
}

pub async fn update(req: Request) -> Response {
    let existing = find(&req).await?;
    let changes: CityChanges = req.validated()?;
    let db = req.db()?.conn();

    let mut active: city::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(zip_code) = changes.zip_code {
        active.zip_code = Set(zip_code);
    }
    if let Some(province_id) = changes.province_id {
        ensure_exists::<province::Entity, _>(db, province_id, "Province").await?;
        active.province_id = Set(province_id);
    }

    let city = active.update(db).await.map_err(FrameworkError::from)?;
    json(serde_json::json!(city))
}

pub async fn destroy(req: Request) -> Response {
    let city = find(&req).await?;
    city::Entity::delete_by_id(city.id)
        .exec(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    deleted("City")
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use serde_json::json;

    #[tokio::test]
    async fn cities_belong_to_existing_provinces() {
        let app = TestApp::new().await;

        let orphan = app
            .send(
                "POST",
                "/api/cities",
                json!({ "name": "Springfield", "zip_code": "12345", "province_id": 99 }),
            )
            .await;
        assert_eq!(orphan.status_code(), 422);
        assert_eq!(
            orphan.json_body(),
            Some(json!({ "message": "Province 99 does not exist" }))
        );

        let province = app.send("POST", "/api/provinces", json!({ "name": "North" })).await;
        let province_id = province.json_body().unwrap()["id"].as_i64().unwrap();

        let city = app
            .send(
                "POST",
                "/api/cities",
                json!({ "name": "Springfield", "zip_code": "12345", "province_id": province_id }),
            )
            .await;
        assert_eq!(city.status_code(), 201);

        let listed = app
            .call("GET", &format!("/api/provinces/{}/cities", province_id))
            .await;
        assert_eq!(listed.json_body().unwrap()[0]["name"], "Springfield");

        let blocked = app
            .call("DELETE", &format!("/api/provinces/{}", province_id))
            .await;
        assert_eq!(blocked.status_code(), 409);
    }
}
