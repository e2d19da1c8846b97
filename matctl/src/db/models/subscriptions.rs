//! Database models for membership subscriptions.

use crate::types::{SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Subscription plan type stored as TEXT in database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Unlimited bookings while the active period lasts
    TimeBased,
    /// Finite countable number of bookable sessions
    SessionPack,
}

/// Subscription lifecycle status stored as TEXT in database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
}

/// Database record for a subscription
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionDBResponse {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    /// NULL for time-based plans, non-negative for session packs
    pub remaining_sessions: Option<i32>,
    pub starts_on: DateTime<Utc>,
    pub ends_on: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Database request for creating a new subscription
#[derive(Debug, Clone)]
pub struct SubscriptionCreateDBRequest {
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub remaining_sessions: Option<i32>,
    pub starts_on: DateTime<Utc>,
    pub ends_on: DateTime<Utc>,
}
