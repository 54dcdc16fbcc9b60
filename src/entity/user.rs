//! User entity
//!
//! Table: huddle_user

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account roles
pub mod role {
    pub const ADMIN: &str = "admin";
    pub const MEMBER: &str = "member";
}

/// Account status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    /// Registered but not yet activated
    Inactive = 0,
    /// Normal
    Active = 1,
    /// Disabled by an administrator
    Disabled = 2,
}

impl From<i32> for UserStatus {
    fn from(value: i32) -> Self {
        match value {
            0 => UserStatus::Inactive,
            1 => UserStatus::Active,
            2 => UserStatus::Disabled,
            _ => UserStatus::Inactive,
        }
    }
}

impl From<UserStatus> for i32 {
    fn from(status: UserStatus) -> Self {
        status as i32
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "huddle_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Username (unique)
    #[sea_orm(column_type = "String(Some(32))", unique)]
    pub username: String,

    /// Password (bcrypt hash)
    #[sea_orm(column_type = "String(Some(128))")]
    #[serde(skip_serializing)]
    pub password: String,

    /// Display name
    #[sea_orm(column_type = "String(Some(64))")]
    pub full_name: String,

    /// Email
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub email: Option<String>,

    /// Account role: "admin" or "member"
    #[sea_orm(column_type = "String(Some(16))")]
    pub role: String,

    /// Last login time (Unix timestamp)
    pub last_login: i64,

    /// Account status: 0=inactive, 1=active, 2=disabled
    pub status: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// Cross-module relations are resolved with manual queries

impl ActiveModelBehavior for ActiveModel {}

/// User response (without the password hash)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    #[serde(rename = "lastLogin")]
    pub last_login: i64,
    pub status: i32,
}

impl From<Model> for UserResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            full_name: model.full_name,
            email: model.email,
            role: model.role,
            last_login: model.last_login,
            status: model.status,
        }
    }
}
