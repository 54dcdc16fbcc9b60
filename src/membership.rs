//! Group membership lifecycle
//!
//! Implements join, leave, and approval over `group` and `group_member`
//! rows, keeping the capacity invariant: `member_count` mirrors the number
//! of active membership rows and never exceeds `max_members`.
//!
//! Every operation runs as a single transaction, and the counter only moves
//! through guarded conditional updates (`member_count < max_members` /
//! `member_count > 0`), so two racing joins cannot both claim the last slot.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr, TransactionError, TransactionTrait,
};
use thiserror::Error;

use crate::entity::group;
use crate::entity::group_member::{self, MembershipStatus};

/// Outcomes a caller can hit when mutating membership. All variants except
/// `Store` are expected, user-facing results; `Store` is an unexpected
/// datastore failure whose display text stays generic.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("you must be signed in to do that")]
    Unauthenticated,

    #[error("group not found")]
    GroupNotFound,

    #[error("this group is closed")]
    GroupInactive,

    #[error("this group is full")]
    CapacityExceeded,

    #[error("you are already a member of this group")]
    AlreadyMember,

    #[error("your join request is waiting for approval")]
    RequestPending,

    #[error("you cannot join this group")]
    Banned,

    #[error("you are not a member of this group")]
    NotAMember,

    #[error("temporary problem, please try again")]
    Store(#[source] DbErr),
}

impl From<DbErr> for MembershipError {
    fn from(err: DbErr) -> Self {
        MembershipError::Store(err)
    }
}

/// Membership state machine, with the absence of a row modeled explicitly.
///
/// `None -> Pending -> Active` for private groups, `None -> Active` for
/// public ones. `Banned` is written by moderation elsewhere and is terminal
/// as far as join is concerned. Leave returns any state to `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipState {
    None,
    Pending,
    Active,
    Banned,
}

impl MembershipState {
    pub fn of(row: Option<&group_member::Model>) -> Self {
        match row.map(|m| m.status) {
            Some(MembershipStatus::Pending) => MembershipState::Pending,
            Some(MembershipStatus::Active) => MembershipState::Active,
            Some(MembershipStatus::Banned) => MembershipState::Banned,
            None => MembershipState::None,
        }
    }
}

/// Result of a successful join: which status the new membership got.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinOutcome {
    pub status: MembershipStatus,
}

/// Join a group on behalf of `user_id`.
///
/// Validation order: group exists, group is active, group has room, caller
/// holds no membership row. Public groups admit immediately (status active,
/// counter incremented); private groups record a pending request that does
/// not touch the counter. Row creation and the increment commit or roll
/// back together.
pub async fn join_group(
    db: &DatabaseConnection,
    group_id: i64,
    user_id: i64,
) -> Result<JoinOutcome, MembershipError> {
    db.transaction::<_, JoinOutcome, MembershipError>(|txn| {
        Box::pin(async move {
            let group = group::Entity::find_by_id(group_id)
                .one(txn)
                .await?
                .ok_or(MembershipError::GroupNotFound)?;

            if !group.is_active {
                return Err(MembershipError::GroupInactive);
            }
            if group.member_count >= group.max_members {
                return Err(MembershipError::CapacityExceeded);
            }

            let existing = group_member::Entity::find_by_id((group_id, user_id))
                .one(txn)
                .await?;
            match MembershipState::of(existing.as_ref()) {
                MembershipState::Active => return Err(MembershipError::AlreadyMember),
                MembershipState::Pending => return Err(MembershipError::RequestPending),
                MembershipState::Banned => return Err(MembershipError::Banned),
                MembershipState::None => {}
            }

            let status = if group.is_public {
                MembershipStatus::Active
            } else {
                MembershipStatus::Pending
            };

            let row = group_member::ActiveModel {
                group_id: Set(group_id),
                user_id: Set(user_id),
                status: Set(status),
                joined_at: Set(chrono::Utc::now().timestamp()),
            };
            group_member::Entity::insert(row)
                .exec_without_returning(txn)
                .await
                .map_err(classify_insert_err)?;

            // Only counted memberships move the counter, and only through the
            // guarded update: zero rows affected means another caller took the
            // last slot after our read, so the whole join rolls back.
            if status == MembershipStatus::Active && !try_increment(txn, group_id).await? {
                return Err(MembershipError::CapacityExceeded);
            }

            Ok(JoinOutcome { status })
        })
    })
    .await
    .map_err(surface)
}

/// Leave a group. The membership row is deleted whatever its status; the
/// counter is decremented only when the row was counted (active). Leaving
/// twice is an error by design: the second call reports `NotAMember`.
pub async fn leave_group(
    db: &DatabaseConnection,
    group_id: i64,
    user_id: i64,
) -> Result<(), MembershipError> {
    db.transaction::<_, (), MembershipError>(|txn| {
        Box::pin(async move {
            let member = group_member::Entity::find_by_id((group_id, user_id))
                .one(txn)
                .await?
                .ok_or(MembershipError::NotAMember)?;

            group_member::Entity::delete_by_id((group_id, user_id))
                .exec(txn)
                .await?;

            if member.status == MembershipStatus::Active {
                decrement(txn, group_id).await?;
            }

            Ok(())
        })
    })
    .await
    .map_err(surface)
}

/// Flip a pending membership to active. Capacity is re-validated at the
/// moment of transition with the same guarded increment join uses: a group
/// that filled up since the request was made fails the approval with
/// `CapacityExceeded` and the row stays pending.
pub async fn approve_member(
    db: &DatabaseConnection,
    group_id: i64,
    user_id: i64,
) -> Result<(), MembershipError> {
    db.transaction::<_, (), MembershipError>(|txn| {
        Box::pin(async move {
            let member = group_member::Entity::find_by_id((group_id, user_id))
                .one(txn)
                .await?
                .ok_or(MembershipError::NotAMember)?;

            match member.status {
                MembershipStatus::Active => return Err(MembershipError::AlreadyMember),
                MembershipStatus::Banned => return Err(MembershipError::Banned),
                MembershipStatus::Pending => {}
            }

            if !try_increment(txn, group_id).await? {
                return Err(MembershipError::CapacityExceeded);
            }

            let mut row: group_member::ActiveModel = member.into();
            row.status = Set(MembershipStatus::Active);
            row.update(txn).await?;

            Ok(())
        })
    })
    .await
    .map_err(surface)
}

/// Conditional increment: `member_count = member_count + 1` only while
/// `member_count < max_members`. Returns whether a row was updated.
async fn try_increment<C: ConnectionTrait>(conn: &C, group_id: i64) -> Result<bool, DbErr> {
    let res = group::Entity::update_many()
        .col_expr(
            group::Column::MemberCount,
            Expr::col(group::Column::MemberCount).add(1),
        )
        .filter(group::Column::Id.eq(group_id))
        .filter(Expr::col(group::Column::MemberCount).lt(Expr::col(group::Column::MaxMembers)))
        .exec(conn)
        .await?;
    Ok(res.rows_affected > 0)
}

/// Conditional decrement, floored at zero.
async fn decrement<C: ConnectionTrait>(conn: &C, group_id: i64) -> Result<(), DbErr> {
    group::Entity::update_many()
        .col_expr(
            group::Column::MemberCount,
            Expr::col(group::Column::MemberCount).sub(1),
        )
        .filter(group::Column::Id.eq(group_id))
        .filter(Expr::col(group::Column::MemberCount).gt(0))
        .exec(conn)
        .await?;
    Ok(())
}

/// A unique-constraint violation on the (group_id, user_id) key means a
/// concurrent join already created the row; surface it as the conflict it is.
fn classify_insert_err(err: DbErr) -> MembershipError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => MembershipError::AlreadyMember,
        _ => MembershipError::Store(err),
    }
}

fn surface(err: TransactionError<MembershipError>) -> MembershipError {
    let err = match err {
        TransactionError::Connection(e) => MembershipError::Store(e),
        TransactionError::Transaction(e) => e,
    };
    if let MembershipError::Store(e) = &err {
        tracing::error!("membership store failure: {}", e);
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn group_row(is_public: bool, is_active: bool, member_count: i32, max_members: i32) -> group::Model {
        group::Model {
            id: 1,
            name: "board-games".to_string(),
            description: None,
            is_public,
            is_active,
            member_count,
            max_members,
        }
    }

    fn member_row(status: MembershipStatus) -> group_member::Model {
        group_member::Model {
            group_id: 1,
            user_id: 7,
            status,
            joined_at: 1_700_000_000,
        }
    }

    fn exec_ok(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn no_members() -> Vec<group_member::Model> {
        Vec::new()
    }

    #[test]
    fn test_membership_state_of_row() {
        assert_eq!(MembershipState::of(None), MembershipState::None);
        assert_eq!(
            MembershipState::of(Some(&member_row(MembershipStatus::Pending))),
            MembershipState::Pending
        );
        assert_eq!(
            MembershipState::of(Some(&member_row(MembershipStatus::Active))),
            MembershipState::Active
        );
        assert_eq!(
            MembershipState::of(Some(&member_row(MembershipStatus::Banned))),
            MembershipState::Banned
        );
    }

    #[tokio::test]
    async fn test_join_public_group_becomes_active() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group_row(true, true, 4, 5)]])
            .append_query_results([no_members()])
            // membership insert, then the guarded counter increment
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();

        let outcome = join_group(&db, 1, 7).await.unwrap();
        assert_eq!(outcome.status, MembershipStatus::Active);
    }

    #[tokio::test]
    async fn test_join_private_group_becomes_pending() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group_row(false, true, 0, 10)]])
            .append_query_results([no_members()])
            // only the insert: a pending membership must not touch the counter,
            // and the mock would fail the test if a second statement ran
            .append_exec_results([exec_ok(1)])
            .into_connection();

        let outcome = join_group(&db, 1, 7).await.unwrap();
        assert_eq!(outcome.status, MembershipStatus::Pending);
    }

    #[tokio::test]
    async fn test_join_missing_group() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<group::Model>::new()])
            .into_connection();

        let err = join_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::GroupNotFound));
    }

    #[tokio::test]
    async fn test_join_inactive_group() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group_row(true, false, 0, 5)]])
            .into_connection();

        let err = join_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::GroupInactive));
    }

    #[tokio::test]
    async fn test_join_full_group() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group_row(true, true, 5, 5)]])
            .into_connection();

        let err = join_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::CapacityExceeded));
    }

    #[tokio::test]
    async fn test_join_while_already_active() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group_row(true, true, 3, 5)]])
            .append_query_results([vec![member_row(MembershipStatus::Active)]])
            .into_connection();

        let err = join_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::AlreadyMember));
    }

    #[tokio::test]
    async fn test_join_while_request_pending() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group_row(false, true, 3, 5)]])
            .append_query_results([vec![member_row(MembershipStatus::Pending)]])
            .into_connection();

        let err = join_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::RequestPending));
    }

    #[tokio::test]
    async fn test_join_while_banned() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group_row(true, true, 3, 5)]])
            .append_query_results([vec![member_row(MembershipStatus::Banned)]])
            .into_connection();

        let err = join_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::Banned));
    }

    #[tokio::test]
    async fn test_join_loses_capacity_race() {
        // The read said 4/5, but by the time the guarded increment runs the
        // last slot is gone: zero rows affected, join fails, nothing commits.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![group_row(true, true, 4, 5)]])
            .append_query_results([no_members()])
            .append_exec_results([exec_ok(1), exec_ok(0)])
            .into_connection();

        let err = join_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::CapacityExceeded));
    }

    #[tokio::test]
    async fn test_join_store_failure_is_generic() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .into_connection();

        let err = join_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::Store(_)));
        // Internal detail never reaches the user-facing message
        assert_eq!(err.to_string(), "temporary problem, please try again");
    }

    #[tokio::test]
    async fn test_leave_active_member_decrements() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![member_row(MembershipStatus::Active)]])
            // row delete, then the guarded decrement
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();

        leave_group(&db, 1, 7).await.unwrap();
    }

    #[tokio::test]
    async fn test_leave_pending_member_keeps_counter() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![member_row(MembershipStatus::Pending)]])
            // only the delete: an uncounted membership must not touch the counter
            .append_exec_results([exec_ok(1)])
            .into_connection();

        leave_group(&db, 1, 7).await.unwrap();
    }

    #[tokio::test]
    async fn test_leave_without_membership() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([no_members()])
            .into_connection();

        let err = leave_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::NotAMember));
    }

    #[tokio::test]
    async fn test_leave_twice_reports_not_a_member() {
        // First leave succeeds, second finds no row
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![member_row(MembershipStatus::Active)]])
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .append_query_results([no_members()])
            .into_connection();

        leave_group(&db, 1, 7).await.unwrap();
        let err = leave_group(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::NotAMember));
    }

    #[tokio::test]
    async fn test_approve_pending_member() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![member_row(MembershipStatus::Pending)]])
            .append_exec_results([exec_ok(1)])
            // the status update returns the refreshed row
            .append_query_results([vec![member_row(MembershipStatus::Active)]])
            .into_connection();

        approve_member(&db, 1, 7).await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_revalidates_capacity() {
        // The group filled up after the request was made: the guarded
        // increment updates nothing and the row stays pending.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![member_row(MembershipStatus::Pending)]])
            .append_exec_results([exec_ok(0)])
            .into_connection();

        let err = approve_member(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::CapacityExceeded));
    }

    #[tokio::test]
    async fn test_approve_non_pending_member() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![member_row(MembershipStatus::Active)]])
            .into_connection();

        let err = approve_member(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::AlreadyMember));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([no_members()])
            .into_connection();

        let err = approve_member(&db, 1, 7).await.unwrap_err();
        assert!(matches!(err, MembershipError::NotAMember));
    }
}
