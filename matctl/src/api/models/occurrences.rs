//! API request/response models for class occurrences.

use super::pagination::Pagination;
use crate::db::models::occurrences::{OccurrenceDBResponse, OccurrenceStatus};
use crate::db::models::reservations::ReservationDBResponse;
use crate::types::{OccurrenceId, ReservationId, UserId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OccurrenceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: OccurrenceId,
    pub course_name: String,
    pub instance_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub max_capacity: i32,
    pub current_reservations: i32,
    /// Seats still bookable without joining the waiting list
    pub spots_remaining: i32,
    pub status: OccurrenceStatus,
    pub created_at: DateTime<Utc>,
}

impl From<OccurrenceDBResponse> for OccurrenceResponse {
    fn from(db: OccurrenceDBResponse) -> Self {
        let spots_remaining = (db.max_capacity - db.current_reservations).max(0);
        Self {
            id: db.id,
            course_name: db.course_name,
            instance_date: db.instance_date,
            start_time: db.start_time,
            end_time: db.end_time,
            location: db.location,
            max_capacity: db.max_capacity,
            current_reservations: db.current_reservations,
            spots_remaining,
            status: db.status,
            created_at: db.created_at,
        }
    }
}

/// Query parameters for listing occurrences
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListOccurrencesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Earliest class date to include
    pub from: Option<NaiveDate>,
    /// Latest class date to include
    pub to: Option<NaiveDate>,

    pub status: Option<OccurrenceStatus>,
}

/// One waiting-list entry, in queue order (staff view)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WaitlistEntryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub reservation_id: ReservationId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub position: i32,
    pub reserved_at: DateTime<Utc>,
}

impl From<ReservationDBResponse> for WaitlistEntryResponse {
    fn from(db: ReservationDBResponse) -> Self {
        Self {
            reservation_id: db.id,
            user_id: db.user_id,
            position: db.waiting_list_position.unwrap_or(0),
            reserved_at: db.reserved_at,
        }
    }
}
