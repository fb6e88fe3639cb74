use chrono::Utc;
use kit::{json, json_status, AppError, FrameworkError, GroupRouter, Request, Response};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use serde::Deserialize;
use validator::Validate;

use super::{deleted, id};
use crate::actions::password;
use crate::models::user::{self, Role};
use crate::models::order;

#[derive(Debug, Deserialize, Validate)]
pub struct UserPayload {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserChanges {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: Option<String>,
    pub role: Option<Role>,
}

pub fn routes(r: GroupRouter) -> GroupRouter {
    r.get("/", index)
        .get("/{id}", show)
        .post("/", store)
        .update("/{id}", update)
        .delete("/{id}", destroy)
}

async fn find(req: &Request) -> Result<user::Model, FrameworkError> {
    user::Entity::find_by_id(id(req)?)
        .one(req.db()?.conn())
        .await?
        .ok_or_else(|| FrameworkError::model_not_found("User"))
}

/// 409 when another account already uses `email`
pub(crate) async fn ensure_email_free(
    req: &Request,
    email: &str,
    except: Option<i32>,
) -> Result<(), FrameworkError> {
    let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    if query.count(req.db()?.conn()).await? > 0 {
        return Err(AppError::conflict("Email already registered").into());
    }
    Ok(())
}

/// Unique index violations on `users.email` from writes that raced past
/// [`ensure_email_free`]
pub(crate) fn email_conflict(e: DbErr) -> FrameworkError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::conflict("Email already registered").into()
        }
        _ => e.into(),
    }
}

/// Insert an account with a hashed password
pub(crate) async fn create(req: &Request, payload: UserPayload) -> Result<user::Model, FrameworkError> {
    ensure_email_free(req, &payload.email, None).await?;

    let user = user::ActiveModel {
        name: Set(payload.name),
        email: Set(payload.email),
        password: Set(password::hash(payload.password).await?),
        role: Set(payload.role.as_str().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(req.db()?.conn())
    .await
    .map_err(email_conflict)?;

    tracing::info!(user_id = user.id, role = %user.role, "user created");
    Ok(user)
}

pub async fn index(req: Request) -> Response {
    let users = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(req.db()?.conn())
        .await
        .map_err(FrameworkError::from)?;
    json(serde_json::json!(users))
}

pub async fn show(req: Request) -> Response {
    json(serde_json::json!(find(&req).await?))
}

pub async fn store(req: Request) -> Response {
    let payload: UserPayload = req.validated()?;
    let user = create(&req, payload).await?;
    json_status(201, serde_json::json!(user))
}

pub async fn update(req: Request) -> Response {
    let existing = find(&req).await?;
    let changes: UserChanges = req.validated()?;
    let user_id = existing.id;

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(email) = changes.email {
        ensure_email_free(&req, &email, Some(user_id)).await?;
        active.email = Set(email);
    }
    if let Some(plain) = changes.password {
        active.password = Set(password::hash(plain).await?);
    }
    if let Some(role) = changes.role {
        active.role = Set(role.as_str().to_string());
    }

    let user = active
        .update(req.db()?.conn())
        .await
        .map_err(email_conflict)?;
    json(serde_json::json!(user))
}

pub async fn destroy(req: Request) -> Response {
    let user = find(&req).await?;
    let db = req.db()?.conn();

    let orders = order::Entity::find()
        .filter(order::Column::UserId.eq(user.id))
        .count(db)
        .await
        .map_err(FrameworkError::from)?;
    if orders > 0 {
        return Err(AppError::conflict("User has orders").into());
    }

    user::Entity::delete_by_id(user.id)
        .exec(db)
        .await
        .map_err(FrameworkError::from)?;
    deleted("User")
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use serde_json::json;

    #[tokio::test]
    async fn password_is_hashed_and_hidden() {
        let app = TestApp::new().await;

        let created = app
            .send(
                "POST",
                "/api/users",
                json!({ "name": "Bo", "email": "bo@shop.test", "password": "long-enough" }),
            )
            .await;
        assert_eq!(created.status_code(), 201);
        let body = created.json_body().unwrap();
        assert_eq!(body["role"], "customer");
        assert!(body.get("password").is_none());

        let duplicate = app
            .send(
                "POST",
                "/api/users",
                json!({ "name": "Bo", "email": "bo@shop.test", "password": "long-enough" }),
            )
            .await;
        assert_eq!(duplicate.status_code(), 409);

        let bad_role = app
            .send(
                "POST",
                "/api/users",
                json!({ "name": "Cy", "email": "cy@shop.test", "password": "long-enough", "role": "root" }),
            )
            .await;
        assert_eq!(bad_role.status_code(), 422);

        let promoted = app
            .send(
                "PATCH",
                &format!("/api/users/{}", body["id"]),
                json!({ "role": "admin" }),
            )
            .await;
        assert_eq!(promoted.json_body().unwrap()["role"], "admin");
    }

    #[tokio::test]
    async fn racing_duplicate_insert_maps_to_conflict() {
        use super::email_conflict;
        use crate::models::user;
        use chrono::Utc;
        use sea_orm::{ActiveModelTrait, Set};

        let app = TestApp::new().await;
        let conn = app.db.connection();
        let row = || user::ActiveModel {
            name: Set("Hal".to_string()),
            email: Set("hal@shop.test".to_string()),
            password: Set("hash".to_string()),
            role: Set("customer".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        row().insert(conn.inner()).await.unwrap();
        let err = row().insert(conn.inner()).await.unwrap_err();

        let mapped = email_conflict(err);
        assert_eq!(mapped.status_code(), 409);
        assert_eq!(mapped.to_string(), "Email already registered");
    }
}
