//! OpLog entity - operation audit log
//!
//! Table: huddle_op_log

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Operation type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    Login,
    Logout,
    Register,
    CreateGroup,
    JoinGroup,
    LeaveGroup,
    ApproveMember,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Login => "login",
            OpType::Logout => "logout",
            OpType::Register => "register",
            OpType::CreateGroup => "create group",
            OpType::JoinGroup => "join group",
            OpType::LeaveGroup => "leave group",
            OpType::ApproveMember => "approve member",
        }
    }
}

/// Operation result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpResult {
    Success,
    Failed,
}

impl OpResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpResult::Success => "success",
            OpResult::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "huddle_op_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Operation time (Unix timestamp)
    pub op_time: i64,

    /// Acting user
    #[sea_orm(column_type = "String(Some(32))")]
    pub username: String,

    /// Operation type
    #[sea_orm(column_type = "String(Some(32))")]
    pub op_type: String,

    /// Operation description
    #[sea_orm(column_type = "Text")]
    pub op_desc: String,

    /// Operation result
    #[sea_orm(column_type = "String(Some(16))")]
    pub result: String,

    /// Client IP
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub ip: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
