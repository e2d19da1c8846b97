//! Database models for dated class occurrences.

use crate::types::OccurrenceId;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Occurrence lifecycle status stored as TEXT in database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceStatus {
    Scheduled,
    Cancelled,
    Completed,
}

/// Database record for a class occurrence.
///
/// `current_reservations` is the capacity ledger: it must always equal the
/// number of `confirmed` reservations on this occurrence and is only mutated
/// through the atomic claim/release operations in
/// [`crate::db::handlers::Occurrences`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OccurrenceDBResponse {
    pub id: OccurrenceId,
    pub course_name: String,
    pub instance_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub max_capacity: i32,
    pub current_reservations: i32,
    pub status: OccurrenceStatus,
    pub created_at: DateTime<Utc>,
}

impl OccurrenceDBResponse {
    /// Wall-clock start of this occurrence, used for the refund lead-time check
    pub fn starts_at(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.instance_date.and_time(self.start_time))
    }
}

/// Database request for creating a new class occurrence
#[derive(Debug, Clone)]
pub struct OccurrenceCreateDBRequest {
    pub course_name: String,
    pub instance_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub max_capacity: i32,
}
