//! Group handlers
//!
//! Implements group creation and browsing

use axum::{extract::Query, response::Json, Extension};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashMap;

use crate::entity::group::{self, GroupResponse};
use crate::entity::group_member::{self, GroupMemberResponse, MembershipStatus};
use crate::entity::op_log::{OpResult, OpType};
use crate::entity::user;
use crate::error::{AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::middleware::auth::CurrentUser;
use crate::middleware::DbConn;
use crate::routes::ApiResponse;

/// Create group request
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "isPublic", default)]
    pub is_public: bool,
    #[serde(rename = "maxMembers", default = "default_max_members")]
    pub max_members: i32,
}

fn default_max_members() -> i32 {
    100
}

/// Query parameters
#[derive(Debug, Deserialize)]
pub struct GroupIdQuery {
    #[serde(rename = "groupId")]
    pub group_id: i64,
}

/// POST /api/group/create
pub async fn create_group(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CreateGroupRequest>,
) -> Json<ApiResponse<GroupResponse>> {
    if !current_user.is_admin() {
        return Json(ApiResponse::error("only administrators can create groups"));
    }
    if req.name.is_empty() || req.name.len() > 64 {
        return Json(ApiResponse::error("invalid group name"));
    }
    if req.max_members < 1 {
        return Json(ApiResponse::error("maxMembers must be at least 1"));
    }

    // Check if group name already exists
    let existing = group::Entity::find()
        .filter(group::Column::Name.eq(&req.name))
        .one(&*db)
        .await;

    match existing {
        Ok(Some(_)) => return Json(ApiResponse::error("group name already exists")),
        Err(e) => {
            tracing::error!("Database error: {}", e);
            return Json(ApiResponse::error("internal error"));
        }
        Ok(None) => {}
    }

    // Create group in transaction; the creator takes the first slot
    let creator_id = current_user.id;
    let result = (&*db).transaction::<_, group::Model, sea_orm::DbErr>(|txn| {
        Box::pin(async move {
            let new_group = group::ActiveModel {
                name: Set(req.name.clone()),
                description: Set(req.description.clone()),
                is_public: Set(req.is_public),
                is_active: Set(true),
                member_count: Set(1),
                max_members: Set(req.max_members),
                ..Default::default()
            };
            let created = new_group.insert(txn).await?;

            let membership = group_member::ActiveModel {
                group_id: Set(created.id),
                user_id: Set(creator_id),
                status: Set(MembershipStatus::Active),
                joined_at: Set(chrono::Utc::now().timestamp()),
            };
            group_member::Entity::insert(membership)
                .exec_without_returning(txn)
                .await?;

            Ok(created)
        })
    }).await;

    match result {
        Ok(created) => {
            let op_desc = format!("group: {}", created.name);
            log_operation(&current_user.username, OpType::CreateGroup, &op_desc, OpResult::Success, None);
            Json(ApiResponse::success(
                GroupResponse::from(created).with_membership(MembershipStatus::Active.as_str()),
            ))
        }
        Err(e) => {
            tracing::error!("Failed to create group: {}", e);
            Json(ApiResponse::error("internal error"))
        }
    }
}

/// GET /api/group/list - active groups annotated with the caller's membership
pub async fn list_groups(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<GroupResponse>>>> {
    let groups = group::Entity::find()
        .filter(group::Column::IsActive.eq(true))
        .order_by_asc(group::Column::Name)
        .all(&*db)
        .await?;

    let memberships: HashMap<i64, MembershipStatus> = group_member::Entity::find()
        .filter(group_member::Column::UserId.eq(current_user.id))
        .all(&*db)
        .await?
        .into_iter()
        .map(|m| (m.group_id, m.status))
        .collect();

    let groups = groups
        .into_iter()
        .map(|g| {
            let response = GroupResponse::from(g);
            match memberships.get(&response.id) {
                Some(status) => response.with_membership(status.as_str()),
                None => response,
            }
        })
        .collect();

    Ok(Json(ApiResponse::success(groups)))
}

/// GET /api/group/members - members of a group with user details
pub async fn get_group_members(
    Extension(db): Extension<DbConn>,
    Query(query): Query<GroupIdQuery>,
) -> AppResult<Json<ApiResponse<Vec<GroupMemberResponse>>>> {
    // Check if group exists
    group::Entity::find_by_id(query.group_id)
        .one(&*db)
        .await?
        .ok_or_not_found("group not found")?;

    let members = group_member::Entity::find()
        .filter(group_member::Column::GroupId.eq(query.group_id))
        .all(&*db)
        .await?;

    let mut responses = Vec::new();
    for m in members {
        let u = user::Entity::find_by_id(m.user_id).one(&*db).await?;

        let response = GroupMemberResponse::from(m);
        responses.push(match u {
            Some(u) => response.with_user_info(u.username, u.full_name),
            None => response,
        });
    }

    Ok(Json(ApiResponse::success(responses)))
}
