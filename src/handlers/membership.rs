//! Membership handlers
//!
//! Thin wrappers over the membership service. Every outcome renders as the
//! uniform `{ success, message | error }` payload, so the frontend applies
//! one rendering rule to joins, leaves, and approvals alike.

use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;

use crate::entity::group_member::MembershipStatus;
use crate::entity::op_log::{OpResult, OpType};
use crate::handlers::audit::service::log_operation;
use crate::membership::{self, MembershipError};
use crate::middleware::auth::CurrentUser;
use crate::middleware::DbConn;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Query parameters
#[derive(Debug, Deserialize)]
pub struct GroupIdQuery {
    #[serde(rename = "groupId")]
    pub group_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MemberQuery {
    #[serde(rename = "groupId")]
    pub group_id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
}

/// POST /api/group/join
pub async fn join_group(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    user: Option<Extension<CurrentUser>>,
    Query(query): Query<GroupIdQuery>,
) -> Json<ApiResponse<()>> {
    let Some(Extension(user)) = user else {
        return Json(ApiResponse::error(
            MembershipError::Unauthenticated.to_string(),
        ));
    };

    let op_desc = format!("group {}", query.group_id);
    match membership::join_group(&db, query.group_id, user.id).await {
        Ok(outcome) => {
            let message = match outcome.status {
                MembershipStatus::Active => "you have joined the group",
                _ => "join request sent, waiting for approval",
            };
            log_operation(&user.username, OpType::JoinGroup, &op_desc, OpResult::Success, None);
            state.notify_group_changed(query.group_id);
            Json(ApiResponse::success_msg(message))
        }
        Err(err) => {
            log_operation(&user.username, OpType::JoinGroup, &op_desc, OpResult::Failed, None);
            Json(ApiResponse::error(err.to_string()))
        }
    }
}

/// POST /api/group/leave
pub async fn leave_group(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    user: Option<Extension<CurrentUser>>,
    Query(query): Query<GroupIdQuery>,
) -> Json<ApiResponse<()>> {
    let Some(Extension(user)) = user else {
        return Json(ApiResponse::error(
            MembershipError::Unauthenticated.to_string(),
        ));
    };

    let op_desc = format!("group {}", query.group_id);
    match membership::leave_group(&db, query.group_id, user.id).await {
        Ok(()) => {
            log_operation(&user.username, OpType::LeaveGroup, &op_desc, OpResult::Success, None);
            state.notify_group_changed(query.group_id);
            Json(ApiResponse::success_msg("you have left the group"))
        }
        Err(err) => {
            log_operation(&user.username, OpType::LeaveGroup, &op_desc, OpResult::Failed, None);
            Json(ApiResponse::error(err.to_string()))
        }
    }
}

/// POST /api/group/approve
pub async fn approve_member(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    user: Option<Extension<CurrentUser>>,
    Query(query): Query<MemberQuery>,
) -> Json<ApiResponse<()>> {
    let Some(Extension(user)) = user else {
        return Json(ApiResponse::error(
            MembershipError::Unauthenticated.to_string(),
        ));
    };
    if !user.is_admin() {
        return Json(ApiResponse::error(
            "only administrators can approve join requests",
        ));
    }

    let op_desc = format!("group {} user {}", query.group_id, query.user_id);
    match membership::approve_member(&db, query.group_id, query.user_id).await {
        Ok(()) => {
            log_operation(&user.username, OpType::ApproveMember, &op_desc, OpResult::Success, None);
            state.notify_group_changed(query.group_id);
            Json(ApiResponse::success_msg("member approved"))
        }
        Err(err) => {
            log_operation(&user.username, OpType::ApproveMember, &op_desc, OpResult::Failed, None);
            Json(ApiResponse::error(err.to_string()))
        }
    }
}
