//! Database models for reservations.

use crate::types::{OccurrenceId, ReservationId, SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reservation lifecycle status stored as TEXT in database.
///
/// `cancelled` and `completed` are terminal. A reservation never moves back
/// from `confirmed` to `waiting_list`: a confirmed seat is never demoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Confirmed,
    WaitingList,
    Cancelled,
    Completed,
}

/// Database record for a reservation
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReservationDBResponse {
    pub id: ReservationId,
    pub user_id: UserId,
    pub occurrence_id: OccurrenceId,
    pub status: ReservationStatus,
    /// Present only while status is `waiting_list`; dense and gapless from 1
    /// within an occurrence after any queue removal
    pub waiting_list_position: Option<i32>,
    pub subscription_id: Option<SubscriptionId>,
    pub session_deducted: bool,
    pub sessions_deducted: i32,
    pub is_free_trial: bool,
    pub refund_amount: i32,
    pub cancellation_reason: Option<String>,
    pub reserved_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub promoted_at: Option<DateTime<Utc>>,
}

/// Database request for inserting a new reservation row.
///
/// Built by the booking lifecycle after validation; never constructed from
/// raw client input.
#[derive(Debug, Clone)]
pub struct ReservationCreateDBRequest {
    pub user_id: UserId,
    pub occurrence_id: OccurrenceId,
    pub status: ReservationStatus,
    pub waiting_list_position: Option<i32>,
    pub subscription_id: Option<SubscriptionId>,
    pub session_deducted: bool,
    pub sessions_deducted: i32,
    pub is_free_trial: bool,
}
