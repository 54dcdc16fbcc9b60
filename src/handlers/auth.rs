//! Authentication handlers
//!
//! Implements login, logout, and current user endpoints

use axum::{http::StatusCode, Extension, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::entity::op_log::{OpResult, OpType};
use crate::entity::user;
use crate::handlers::audit::service::log_operation;
use crate::middleware::auth::{CurrentUser, SESSION_USER_KEY};
use crate::middleware::DbConn;
use crate::routes::ApiResponse;

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Current user response
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub id: i64,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub status: i32,
}

/// POST /api/login
pub async fn login(
    Extension(db): Extension<DbConn>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> (StatusCode, Json<ApiResponse<user::UserResponse>>) {
    // Validate input
    if req.username.is_empty() || req.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("bad request")),
        );
    }

    // Find user in database
    let db = &*db;
    let user_result = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(db)
        .await;

    let db_user = match user_result {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!("Login failed: user not found - {}", req.username);
            log_operation(&req.username, OpType::Login, "unknown user", OpResult::Failed, None);
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("username or password error")),
            );
        }
        Err(e) => {
            tracing::error!("Database error during login: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("internal error")),
            );
        }
    };

    // Verify password using bcrypt
    let password_valid = bcrypt::verify(&req.password, &db_user.password).unwrap_or(false);
    if !password_valid {
        tracing::warn!("Login failed: wrong password - {}", req.username);
        log_operation(&req.username, OpType::Login, "wrong password", OpResult::Failed, None);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("username or password error")),
        );
    }

    // Disabled accounts may not log in
    if db_user.status == i32::from(user::UserStatus::Disabled) {
        tracing::warn!("Login failed: user disabled - {}", req.username);
        log_operation(&req.username, OpType::Login, "account disabled", OpResult::Failed, None);
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("user is disabled")),
        );
    }

    // Update last login time
    let now = chrono::Utc::now().timestamp();
    let mut active_model: user::ActiveModel = db_user.clone().into();
    active_model.last_login = Set(now);
    if let Err(e) = active_model.update(db).await {
        tracing::error!("Failed to update last login: {}", e);
    }

    // Store username in session
    if let Err(e) = session.insert(SESSION_USER_KEY, db_user.username.clone()).await {
        tracing::error!("Failed to store session: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("internal error")),
        );
    }

    log_operation(&db_user.username, OpType::Login, "", OpResult::Success, None);

    let mut response = user::UserResponse::from(db_user);
    response.last_login = now;
    (StatusCode::OK, Json(ApiResponse::success(response)))
}

/// POST /api/logout
pub async fn logout(session: Session) -> Json<ApiResponse<()>> {
    let username: Option<String> = session.get(SESSION_USER_KEY).await.unwrap_or(None);

    if let Err(e) = session.flush().await {
        tracing::error!("Failed to clear session: {}", e);
    }

    if let Some(username) = username {
        log_operation(&username, OpType::Logout, "", OpResult::Success, None);
    }

    Json(ApiResponse::success_msg("logged out"))
}

/// GET /api/user/current
pub async fn current_user(
    Extension(user): Extension<CurrentUser>,
) -> Json<ApiResponse<CurrentUserResponse>> {
    Json(ApiResponse::success(CurrentUserResponse {
        id: user.id,
        username: user.username,
        full_name: user.full_name,
        email: user.email,
        role: user.role,
        status: user.status,
    }))
}
