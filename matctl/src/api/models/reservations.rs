//! API request/response models for reservations.

use super::pagination::Pagination;
use crate::db::models::reservations::{ReservationDBResponse, ReservationStatus};
use crate::types::{OccurrenceId, ReservationId, SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Request body for booking a class
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationCreate {
    #[schema(value_type = String, format = "uuid")]
    pub occurrence_id: OccurrenceId,
}

/// Request body for cancelling a reservation
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReservationCancel {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ReservationId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub occurrence_id: OccurrenceId,
    pub status: ReservationStatus,
    /// Queue position while on the waiting list, 1 being next in line
    pub waiting_list_position: Option<i32>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub subscription_id: Option<SubscriptionId>,
    pub sessions_deducted: i32,
    pub is_free_trial: bool,
    pub refund_amount: i32,
    pub cancellation_reason: Option<String>,
    pub reserved_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub promoted_at: Option<DateTime<Utc>>,
}

impl From<ReservationDBResponse> for ReservationResponse {
    fn from(db: ReservationDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            occurrence_id: db.occurrence_id,
            status: db.status,
            waiting_list_position: db.waiting_list_position,
            subscription_id: db.subscription_id,
            sessions_deducted: db.sessions_deducted,
            is_free_trial: db.is_free_trial,
            refund_amount: db.refund_amount,
            cancellation_reason: db.cancellation_reason,
            reserved_at: db.reserved_at,
            cancelled_at: db.cancelled_at,
            promoted_at: db.promoted_at,
        }
    }
}

/// Query parameters for listing reservations
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListReservationsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub status: Option<ReservationStatus>,

    /// Restrict to a single class occurrence
    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub occurrence_id: Option<OccurrenceId>,

    /// List another member's reservations (staff only)
    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,

    /// List reservations across all members (staff only)
    pub all: Option<bool>,
}
