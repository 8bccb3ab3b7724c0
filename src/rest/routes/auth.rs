// rest/routes/auth.rs — Registration, login, and identity echo.
//
// These sit outside the bearer-token guard (they establish the
// credential). Login deliberately returns one undifferentiated message
// for unknown email vs wrong password.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{credentials, token, Principal};
use crate::error::{ApiError, Violation};
use crate::storage::PublicUser;
use crate::AppContext;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("static email pattern"));

const PASSWORD_MIN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_lowercase();

    let mut violations = Vec::new();
    if username.is_empty() {
        violations.push(Violation::new("username", "Username is required"));
    }
    if !EMAIL_RE.is_match(&email) {
        violations.push(Violation::new("email", "Email address is not valid"));
    }
    if body.password.chars().count() < PASSWORD_MIN {
        violations.push(Violation::new(
            "password",
            format!("Password must be at least {PASSWORD_MIN} characters"),
        ));
    }
    if !violations.is_empty() {
        return Err(ApiError::ValidationFailed(violations));
    }

    if ctx.storage.find_user_by_username(&username).await?.is_some() {
        return Err(ApiError::InvalidInput("Username already taken".into()));
    }
    if ctx.storage.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::InvalidInput("Email already registered".into()));
    }

    let (hash, salt) = credentials::hash_password(&body.password);
    let user = ctx.storage.create_user(&username, &email, &hash, &salt).await?;
    let signed = token::issue(
        &user.id,
        ctx.config.effective_jwt_secret(),
        ctx.config.token_ttl_hours,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "token": signed,
            "user": PublicUser::from(user),
        })),
    ))
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = ctx.storage.find_user_by_email(body.email.trim()).await?;

    let verified = user.as_ref().is_some_and(|u| {
        credentials::verify_password(&body.password, &u.password_hash, &u.password_salt)
    });
    let Some(user) = user.filter(|_| verified) else {
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid email or password" })),
        )
            .into_response());
    };

    let signed = token::issue(
        &user.id,
        ctx.config.effective_jwt_secret(),
        ctx.config.token_ttl_hours,
    )?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": signed,
        "user": PublicUser::from(user),
    }))
    .into_response())
}

/// Echo the authenticated principal. Sits behind the verifier.
pub async fn me(Extension(principal): Extension<Principal>) -> Json<Value> {
    Json(json!({
        "success": true,
        "user": {
            "id": principal.id,
            "username": principal.username,
            "email": principal.email,
        },
    }))
}
