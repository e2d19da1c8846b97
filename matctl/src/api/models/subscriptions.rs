//! API request/response models for subscriptions.

use super::pagination::Pagination;
use crate::db::models::subscriptions::{PlanType, SubscriptionDBResponse, SubscriptionStatus};
use crate::types::{SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Staff request to create a subscription for a member
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionCreate {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub plan_type: PlanType,
    /// Number of bookable sessions; required for session packs, rejected for
    /// time-based plans
    pub sessions: Option<i32>,
    pub starts_on: DateTime<Utc>,
    pub ends_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SubscriptionId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    pub remaining_sessions: Option<i32>,
    pub starts_on: DateTime<Utc>,
    pub ends_on: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionDBResponse> for SubscriptionResponse {
    fn from(db: SubscriptionDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            plan_type: db.plan_type,
            status: db.status,
            remaining_sessions: db.remaining_sessions,
            starts_on: db.starts_on,
            ends_on: db.ends_on,
            created_at: db.created_at,
        }
    }
}

/// Query parameters for listing subscriptions
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListSubscriptionsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by member (staff only; others always see their own)
    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,

    pub status: Option<SubscriptionStatus>,
}
