//! Entity module - SeaORM entity definitions
//!
//! One module per database table

pub mod group;
pub mod group_member;
pub mod op_log;
pub mod user;
