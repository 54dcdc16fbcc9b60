//! User handlers
//!
//! Implements account registration

use axum::{Extension, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;

use crate::entity::op_log::{OpResult, OpType};
use crate::entity::user;
use crate::error::{AppError, AppResult};
use crate::handlers::audit::service::log_operation;
use crate::middleware::DbConn;
use crate::routes::ApiResponse;

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/register
pub async fn register(
    Extension(db): Extension<DbConn>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<user::UserResponse>>> {
    // Validate input
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    }
    if req.username.len() > 32 {
        return Err(AppError::Validation("username is too long".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    // Check if username already exists
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(&*db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("username already taken".to_string()));
    }

    // Hash password
    let hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

    let new_user = user::ActiveModel {
        username: Set(req.username),
        password: Set(hash),
        full_name: Set(req.full_name),
        email: Set(req.email),
        role: Set(user::role::MEMBER.to_string()),
        last_login: Set(0),
        status: Set(user::UserStatus::Active.into()),
        ..Default::default()
    };
    let created = new_user.insert(&*db).await?;

    log_operation(&created.username, OpType::Register, "", OpResult::Success, None);

    Ok(Json(ApiResponse::success(created.into())))
}
