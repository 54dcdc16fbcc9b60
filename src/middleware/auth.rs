//! Authentication middleware
//!
//! Provides session-based authentication for API routes

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::json;
use std::ops::Deref;
use std::sync::Arc;
use tower_sessions::Session;

use crate::entity::user;
use crate::state::AppState;

/// Session key for storing username
pub const SESSION_USER_KEY: &str = "user";

/// Database connection wrapper for use in handlers via Extension
#[derive(Clone)]
pub struct DbConn(pub Arc<DatabaseConnection>);

impl Deref for DbConn {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Extension to store current user in request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub status: i32,
}

impl CurrentUser {
    /// Admin accounts may create groups, approve join requests, and read
    /// the audit log
    pub fn is_admin(&self) -> bool {
        self.role == user::role::ADMIN
    }
}

/// Paths that don't require authentication
fn is_public_path(path: &str) -> bool {
    // Only authenticate API routes; everything else is static files
    if !path.starts_with("/api") {
        return true;
    }

    matches!(
        path,
        "/api/login" | "/api/logout" | "/api/register" | "/api/health"
    )
}

/// Authentication middleware
pub async fn auth_layer(
    State(state): State<AppState>,
    session: Session,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // All handlers access the database via Extension<DbConn>
    request.extensions_mut().insert(DbConn(state.db.clone()));

    // Skip auth for public paths
    if is_public_path(&path) {
        return next.run(request).await;
    }

    // Get username from session
    let username: Option<String> = session.get(SESSION_USER_KEY).await.unwrap_or(None);

    let Some(username) = username else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "error": "unauthorized"})),
        ).into_response();
    };

    // Look up user in database
    let user_result = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(state.db.as_ref())
        .await;

    match user_result {
        Ok(Some(user_model)) => {
            let current_user = CurrentUser {
                id: user_model.id,
                username: user_model.username,
                full_name: user_model.full_name,
                email: user_model.email.unwrap_or_default(),
                role: user_model.role,
                status: user_model.status,
            };

            request.extensions_mut().insert(current_user);

            next.run(request).await
        }
        Ok(None) => {
            tracing::warn!("User not found in database: {}", username);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "error": "invalid session"})),
            ).into_response()
        }
        Err(e) => {
            tracing::error!("Database error during auth: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "internal error"})),
            ).into_response()
        }
    }
}
