//! Group entity
//!
//! Table: huddle_group

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "huddle_group")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Group name (max 64 chars)
    #[sea_orm(column_type = "String(Some(64))", unique)]
    pub name: String,

    /// Short description shown on the group page
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Public groups admit joiners immediately; private ones queue a request
    pub is_public: bool,

    /// Soft-disable flag; inactive groups reject joins
    pub is_active: bool,

    /// Cached count of active memberships, maintained by the membership service
    pub member_count: i32,

    /// Capacity ceiling for active memberships
    pub max_members: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// Membership rows are queried through the group_member table directly

impl ActiveModelBehavior for ActiveModel {}

/// Group response (includes the caller's membership status, if any)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "isPublic")]
    pub is_public: bool,
    #[serde(rename = "memberCount")]
    pub member_count: i32,
    #[serde(rename = "maxMembers")]
    pub max_members: i32,
    pub membership: Option<String>,
}

impl From<Model> for GroupResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            is_public: model.is_public,
            member_count: model.member_count,
            max_members: model.max_members,
            membership: None,
        }
    }
}

impl GroupResponse {
    pub fn with_membership(mut self, status: impl Into<String>) -> Self {
        self.membership = Some(status.into());
        self
    }
}
