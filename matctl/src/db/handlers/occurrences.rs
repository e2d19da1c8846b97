use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::Repository;
use crate::db::models::occurrences::{OccurrenceCreateDBRequest, OccurrenceDBResponse, OccurrenceStatus};
use crate::types::OccurrenceId;

/// Filter for listing class occurrences
#[derive(Debug, Clone, Default)]
pub struct OccurrenceFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<OccurrenceStatus>,
    pub skip: i64,
    pub limit: i64,
}

/// Repository for class occurrences and the capacity ledger.
///
/// The `current_reservations` counter is only ever mutated through
/// [`try_claim_seat`](Occurrences::try_claim_seat) and
/// [`release_seat`](Occurrences::release_seat), both expressed as atomic
/// conditional updates rather than read-then-write.
pub struct Occurrences<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Occurrences<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Atomically claim one seat if the occurrence is scheduled and not full.
    ///
    /// Check and increment are a single conditional UPDATE, so two concurrent
    /// bookings racing for the last seat cannot both succeed: the loser sees
    /// zero rows affected and falls through to the waiting list.
    #[instrument(skip(self), err)]
    pub async fn try_claim_seat(&mut self, occurrence_id: OccurrenceId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE class_occurrences
             SET current_reservations = current_reservations + 1
             WHERE id = $1 AND status = 'scheduled' AND current_reservations < max_capacity",
        )
        .bind(occurrence_id)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Lock the occurrence row for the rest of the transaction.
    ///
    /// A failed [`try_claim_seat`](Occurrences::try_claim_seat) leaves no
    /// lock behind, so queue joins take this one explicitly: waiting-list
    /// positions are assigned one at a time per occurrence.
    #[instrument(skip(self), err)]
    pub async fn lock_for_update(&mut self, occurrence_id: OccurrenceId) -> Result<()> {
        sqlx::query("SELECT id FROM class_occurrences WHERE id = $1 FOR UPDATE")
            .bind(occurrence_id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// Release one confirmed seat, clamped at zero
    #[instrument(skip(self), err)]
    pub async fn release_seat(&mut self, occurrence_id: OccurrenceId) -> Result<()> {
        sqlx::query(
            "UPDATE class_occurrences
             SET current_reservations = current_reservations - 1
             WHERE id = $1 AND current_reservations > 0",
        )
        .bind(occurrence_id)
        .execute(&mut *self.db)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Repository for Occurrences<'_> {
    type CreateRequest = OccurrenceCreateDBRequest;
    type Response = OccurrenceDBResponse;
    type Id = OccurrenceId;
    type Filter = OccurrenceFilter;

    async fn create(&mut self, request: &OccurrenceCreateDBRequest) -> Result<OccurrenceDBResponse> {
        let occurrence = sqlx::query_as::<_, OccurrenceDBResponse>(
            "INSERT INTO class_occurrences
                (course_name, instance_date, start_time, end_time, location, max_capacity)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(&request.course_name)
        .bind(request.instance_date)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(&request.location)
        .bind(request.max_capacity)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(occurrence)
    }

    async fn get_by_id(&mut self, id: OccurrenceId) -> Result<Option<OccurrenceDBResponse>> {
        let occurrence = sqlx::query_as::<_, OccurrenceDBResponse>("SELECT * FROM class_occurrences WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(occurrence)
    }

    async fn list(&mut self, filter: &OccurrenceFilter) -> Result<Vec<OccurrenceDBResponse>> {
        let occurrences = sqlx::query_as::<_, OccurrenceDBResponse>(
            "SELECT * FROM class_occurrences
             WHERE ($1::DATE IS NULL OR instance_date >= $1)
               AND ($2::DATE IS NULL OR instance_date <= $2)
               AND ($3::TEXT IS NULL OR status = $3)
             ORDER BY instance_date, start_time
             OFFSET $4 LIMIT $5",
        )
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.status)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(occurrences)
    }

    async fn delete(&mut self, id: OccurrenceId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM class_occurrences WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
