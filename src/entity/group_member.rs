//! GroupMember entity
//!
//! One row per (group, user) pair; the composite primary key is also the
//! uniqueness constraint that turns a concurrent double-join into a
//! detectable conflict. Table: huddle_group_member

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership status stored on the row. The absence of a row is the implicit
/// "not a member" state, made explicit by `membership::MembershipState`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum MembershipStatus {
    /// Waiting for approval into a private group
    #[sea_orm(string_value = "pending")]
    Pending,

    /// Counted member
    #[sea_orm(string_value = "active")]
    Active,

    /// Excluded by moderation; join attempts are refused
    #[sea_orm(string_value = "banned")]
    Banned,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Active => "active",
            MembershipStatus::Banned => "banned",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "huddle_group_member")]
pub struct Model {
    /// Group ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: i64,

    /// User ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Only active rows count toward the group's member_count
    pub status: MembershipStatus,

    /// When the row was created (Unix timestamp)
    pub joined_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// Cross-module relations are resolved with manual queries

impl ActiveModelBehavior for ActiveModel {}

/// Group member response (includes user details)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupMemberResponse {
    #[serde(rename = "groupId")]
    pub group_id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub status: String,
    #[serde(rename = "joinedAt")]
    pub joined_at: i64,
    pub username: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
}

impl From<Model> for GroupMemberResponse {
    fn from(model: Model) -> Self {
        Self {
            group_id: model.group_id,
            user_id: model.user_id,
            status: model.status.as_str().to_string(),
            joined_at: model.joined_at,
            username: None,
            full_name: None,
        }
    }
}

impl GroupMemberResponse {
    pub fn with_user_info(mut self, username: String, full_name: String) -> Self {
        self.username = Some(username);
        self.full_name = Some(full_name);
        self
    }
}
