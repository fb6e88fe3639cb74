//! Registration and login

use kit::config::AuthConfig;
use kit::{json, json_status, FrameworkError, GroupRouter, Request, Response};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::user::{create, UserPayload};
use crate::actions::{password, token};
use crate::models::user::{self, Role};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterPayload {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

pub fn routes(auth: AuthConfig) -> impl FnOnce(GroupRouter) -> GroupRouter {
    let auth = Arc::new(auth);
    move |r| {
        r.post("/register", register)
            .post("/login", move |req| login(req, auth.clone()))
    }
}

/// Create a customer account
pub async fn register(req: Request) -> Response {
    let payload: RegisterPayload = req.validated()?;
    let user = create(
        &req,
        UserPayload {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            role: Role::Customer,
        },
    )
    .await?;
    json_status(201, serde_json::json!(user))
}

/// Exchange credentials for an access token
pub async fn login(req: Request, auth: Arc<AuthConfig>) -> Response {
    let payload: LoginPayload = req.validated()?;

    let user = user::Entity::find_by_email(req.db()?.conn(), &payload.email)
        .await
        .map_err(FrameworkError::from)?;
    let Some(user) = user else {
        tracing::info!("login for unknown email");
        return Err(FrameworkError::unauthorized("Invalid credentials").into());
    };

    if !password::verify(payload.password, user.password.clone()).await? {
        tracing::info!(user_id = user.id, "login with wrong password");
        return Err(FrameworkError::unauthorized("Invalid credentials").into());
    }

    let token = token::issue(&user, &auth)?;
    json(serde_json::json!({ "token": token, "user": user }))
}
