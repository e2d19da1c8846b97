use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::models::reservations::{ReservationCreateDBRequest, ReservationDBResponse, ReservationStatus};
use crate::types::{OccurrenceId, ReservationId, UserId};

/// Filter for listing reservations
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub user_id: Option<UserId>,
    pub occurrence_id: Option<OccurrenceId>,
    pub status: Option<ReservationStatus>,
    pub skip: i64,
    pub limit: i64,
}

/// Repository for reservation rows.
///
/// Deliberately does not implement the generic [`crate::db::handlers::Repository`]
/// trait: reservations are created and cancelled only through
/// [`crate::booking`], which owns the state machine.
pub struct Reservations<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Reservations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn insert(&mut self, request: &ReservationCreateDBRequest) -> Result<ReservationDBResponse> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>(
            "INSERT INTO reservations
                (user_id, occurrence_id, status, waiting_list_position, subscription_id,
                 session_deducted, sessions_deducted, is_free_trial)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(request.user_id)
        .bind(request.occurrence_id)
        .bind(request.status)
        .bind(request.waiting_list_position)
        .bind(request.subscription_id)
        .bind(request.session_deducted)
        .bind(request.sessions_deducted)
        .bind(request.is_free_trial)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(reservation)
    }

    pub async fn get_by_id(&mut self, id: ReservationId) -> Result<Option<ReservationDBResponse>> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(reservation)
    }

    /// Fetch a reservation and lock its row for the rest of the transaction
    pub async fn get_by_id_for_update(&mut self, id: ReservationId) -> Result<Option<ReservationDBResponse>> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>("SELECT * FROM reservations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(reservation)
    }

    /// The user's reservation on this occurrence, in any status. The unique
    /// constraint on (user_id, occurrence_id) guarantees at most one row.
    pub async fn find_for_user_and_occurrence(
        &mut self,
        user_id: UserId,
        occurrence_id: OccurrenceId,
    ) -> Result<Option<ReservationDBResponse>> {
        let reservation =
            sqlx::query_as::<_, ReservationDBResponse>("SELECT * FROM reservations WHERE user_id = $1 AND occurrence_id = $2")
                .bind(user_id)
                .bind(occurrence_id)
                .fetch_optional(&mut *self.db)
                .await?;
        Ok(reservation)
    }

    pub async fn list(&mut self, filter: &ReservationFilter) -> Result<Vec<ReservationDBResponse>> {
        let reservations = sqlx::query_as::<_, ReservationDBResponse>(
            "SELECT * FROM reservations
             WHERE ($1::UUID IS NULL OR user_id = $1)
               AND ($2::UUID IS NULL OR occurrence_id = $2)
               AND ($3::TEXT IS NULL OR status = $3)
             ORDER BY reserved_at DESC, id DESC
             OFFSET $4 LIMIT $5",
        )
        .bind(filter.user_id)
        .bind(filter.occurrence_id)
        .bind(filter.status)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(reservations)
    }

    /// Oldest waiting reservation on an occurrence, locked for the rest of
    /// the transaction so concurrent promoters serialize per occurrence.
    /// Creation-time order, not position order: positions are derived from
    /// this ordering, never the other way around.
    pub async fn next_waiting(&mut self, occurrence_id: OccurrenceId) -> Result<Option<ReservationDBResponse>> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>(
            "SELECT * FROM reservations
             WHERE occurrence_id = $1 AND status = 'waiting_list'
             ORDER BY reserved_at, id
             LIMIT 1
             FOR UPDATE",
        )
        .bind(occurrence_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(reservation)
    }

    /// Ordered waiting list for an occurrence
    pub async fn waitlist(&mut self, occurrence_id: OccurrenceId) -> Result<Vec<ReservationDBResponse>> {
        let reservations = sqlx::query_as::<_, ReservationDBResponse>(
            "SELECT * FROM reservations
             WHERE occurrence_id = $1 AND status = 'waiting_list'
             ORDER BY reserved_at, id",
        )
        .bind(occurrence_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(reservations)
    }

    /// Next free waiting-list position for a new queue entry
    pub async fn next_waiting_position(&mut self, occurrence_id: OccurrenceId) -> Result<i32> {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(waiting_list_position) FROM reservations
             WHERE occurrence_id = $1 AND status = 'waiting_list'",
        )
        .bind(occurrence_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(max.unwrap_or(0) + 1)
    }

    /// Renumber waiting-list positions dense from 1, in creation-time order.
    /// Run after any removal from the queue so positions stay gapless.
    #[instrument(skip(self), err)]
    pub async fn renumber_waiting_positions(&mut self, occurrence_id: OccurrenceId) -> Result<()> {
        sqlx::query(
            "WITH ranked AS (
                 SELECT id, ROW_NUMBER() OVER (ORDER BY reserved_at, id) AS position
                 FROM reservations
                 WHERE occurrence_id = $1 AND status = 'waiting_list'
             )
             UPDATE reservations r
             SET waiting_list_position = ranked.position
             FROM ranked
             WHERE r.id = ranked.id",
        )
        .bind(occurrence_id)
        .execute(&mut *self.db)
        .await?;
        Ok(())
    }

    /// Terminal transition to `cancelled`, stamping timestamp, reason and the
    /// refund decision. Only valid from `confirmed` or `waiting_list`.
    #[instrument(skip(self, reason), err)]
    pub async fn mark_cancelled(
        &mut self,
        id: ReservationId,
        reason: Option<&str>,
        refund_amount: i32,
        cancelled_at: DateTime<Utc>,
    ) -> Result<ReservationDBResponse> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>(
            "UPDATE reservations
             SET status = 'cancelled',
                 waiting_list_position = NULL,
                 cancellation_reason = $2,
                 refund_amount = $3,
                 cancelled_at = $4
             WHERE id = $1 AND status IN ('confirmed', 'waiting_list')
             RETURNING *",
        )
        .bind(id)
        .bind(reason)
        .bind(refund_amount)
        .bind(cancelled_at)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(reservation)
    }

    /// Waiting-list to confirmed transition for a promoted candidate.
    /// Overwrites the accounting columns: the entitlement charged at
    /// promotion time may differ from the one resolved when the user queued.
    #[instrument(skip(self), err)]
    pub async fn mark_promoted(
        &mut self,
        id: ReservationId,
        subscription_id: Option<crate::types::SubscriptionId>,
        session_deducted: bool,
        sessions_deducted: i32,
        is_free_trial: bool,
        promoted_at: DateTime<Utc>,
    ) -> Result<ReservationDBResponse> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>(
            "UPDATE reservations
             SET status = 'confirmed',
                 waiting_list_position = NULL,
                 subscription_id = $2,
                 session_deducted = $3,
                 sessions_deducted = $4,
                 is_free_trial = $5,
                 promoted_at = $6,
                 reserved_at = $6
             WHERE id = $1 AND status = 'waiting_list'
             RETURNING *",
        )
        .bind(id)
        .bind(subscription_id)
        .bind(session_deducted)
        .bind(sessions_deducted)
        .bind(is_free_trial)
        .bind(promoted_at)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(reservation)
    }

    /// Count of confirmed reservations, used to audit the capacity ledger
    pub async fn count_confirmed(&mut self, occurrence_id: OccurrenceId) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE occurrence_id = $1 AND status = 'confirmed'")
                .bind(occurrence_id)
                .fetch_one(&mut *self.db)
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::users::Role;
    use crate::test_utils::{create_test_occurrence, create_test_user, enqueue_test_waiting};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_pair_rejected_by_constraint(pool: PgPool) {
        let user = create_test_user(&pool, Role::Member, 0).await;
        let occurrence = create_test_occurrence(&pool, 5).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reservations::new(&mut conn);

        let request = ReservationCreateDBRequest {
            user_id: user.id,
            occurrence_id: occurrence.id,
            status: ReservationStatus::Confirmed,
            waiting_list_position: None,
            subscription_id: None,
            session_deducted: false,
            sessions_deducted: 0,
            is_free_trial: false,
        };
        repo.insert(&request).await.unwrap();

        let err = repo.insert(&request).await.unwrap_err();
        assert!(matches!(err, crate::db::errors::DbError::UniqueViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_next_waiting_is_fifo_by_creation_time(pool: PgPool) {
        let occurrence = create_test_occurrence(&pool, 1).await;
        let a = create_test_user(&pool, Role::Member, 0).await;
        let b = create_test_user(&pool, Role::Member, 0).await;

        let res_a = enqueue_test_waiting(&pool, a.id, occurrence.id, 1).await;
        let _res_b = enqueue_test_waiting(&pool, b.id, occurrence.id, 2).await;

        let mut tx = pool.begin().await.unwrap();
        let mut repo = Reservations::new(&mut tx);
        let head = repo.next_waiting(occurrence.id).await.unwrap().unwrap();
        assert_eq!(head.id, res_a.id);
        tx.commit().await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_renumber_closes_gaps(pool: PgPool) {
        let occurrence = create_test_occurrence(&pool, 1).await;
        let a = create_test_user(&pool, Role::Member, 0).await;
        let b = create_test_user(&pool, Role::Member, 0).await;
        let c = create_test_user(&pool, Role::Member, 0).await;

        let res_a = enqueue_test_waiting(&pool, a.id, occurrence.id, 1).await;
        let _res_b = enqueue_test_waiting(&pool, b.id, occurrence.id, 2).await;
        let _res_c = enqueue_test_waiting(&pool, c.id, occurrence.id, 3).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reservations::new(&mut conn);

        // Remove the head, leaving positions 2 and 3
        repo.mark_cancelled(res_a.id, Some("test"), 0, Utc::now()).await.unwrap();
        repo.renumber_waiting_positions(occurrence.id).await.unwrap();

        let waitlist = repo.waitlist(occurrence.id).await.unwrap();
        let positions: Vec<Option<i32>> = waitlist.iter().map(|r| r.waiting_list_position).collect();
        assert_eq!(positions, vec![Some(1), Some(2)]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_mark_cancelled_refuses_terminal_states(pool: PgPool) {
        let user = create_test_user(&pool, Role::Member, 0).await;
        let occurrence = create_test_occurrence(&pool, 1).await;
        let reservation = enqueue_test_waiting(&pool, user.id, occurrence.id, 1).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reservations::new(&mut conn);

        repo.mark_cancelled(reservation.id, None, 0, Utc::now()).await.unwrap();

        // Second cancellation finds no cancellable row
        let err = repo.mark_cancelled(reservation.id, None, 0, Utc::now()).await.unwrap_err();
        assert!(matches!(err, crate::db::errors::DbError::NotFound));
    }
}
