use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::Repository;
use crate::db::models::subscriptions::{SubscriptionCreateDBRequest, SubscriptionDBResponse, SubscriptionStatus};
use crate::types::{SubscriptionId, UserId};

/// Filter for listing subscriptions
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub user_id: Option<UserId>,
    pub status: Option<SubscriptionStatus>,
    pub skip: i64,
    pub limit: i64,
}

pub struct Subscriptions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Subscriptions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The subscription the booking validator should judge for this user:
    /// the most recently created one, whatever its status. Distinguishing
    /// "expired" from "inactive" from "missing" is the validator's job, so
    /// this query deliberately does not filter on status or dates.
    pub async fn current_for_user(&mut self, user_id: UserId) -> Result<Option<SubscriptionDBResponse>> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>(
            "SELECT * FROM subscriptions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(subscription)
    }

    /// Consume one session from a session pack. Guarded so the balance never
    /// goes negative: returns false when no sessions were left to deduct.
    #[instrument(skip(self), err)]
    pub async fn deduct_session(&mut self, subscription_id: SubscriptionId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE subscriptions SET remaining_sessions = remaining_sessions - 1
             WHERE id = $1 AND remaining_sessions > 0",
        )
        .bind(subscription_id)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Return previously deducted sessions on a refund-eligible cancellation.
    /// Expressed as an atomic delta so it stays correct under retries.
    #[instrument(skip(self), err)]
    pub async fn refund_sessions(&mut self, subscription_id: SubscriptionId, amount: i32) -> Result<()> {
        sqlx::query(
            "UPDATE subscriptions SET remaining_sessions = remaining_sessions + $2
             WHERE id = $1 AND remaining_sessions IS NOT NULL",
        )
        .bind(subscription_id)
        .bind(amount)
        .execute(&mut *self.db)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Repository for Subscriptions<'_> {
    type CreateRequest = SubscriptionCreateDBRequest;
    type Response = SubscriptionDBResponse;
    type Id = SubscriptionId;
    type Filter = SubscriptionFilter;

    async fn create(&mut self, request: &SubscriptionCreateDBRequest) -> Result<SubscriptionDBResponse> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>(
            "INSERT INTO subscriptions (user_id, plan_type, remaining_sessions, starts_on, ends_on)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(request.user_id)
        .bind(request.plan_type)
        .bind(request.remaining_sessions)
        .bind(request.starts_on)
        .bind(request.ends_on)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(subscription)
    }

    async fn get_by_id(&mut self, id: SubscriptionId) -> Result<Option<SubscriptionDBResponse>> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(subscription)
    }

    async fn list(&mut self, filter: &SubscriptionFilter) -> Result<Vec<SubscriptionDBResponse>> {
        let subscriptions = sqlx::query_as::<_, SubscriptionDBResponse>(
            "SELECT * FROM subscriptions
             WHERE ($1::UUID IS NULL OR user_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC
             OFFSET $3 LIMIT $4",
        )
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(subscriptions)
    }

    async fn delete(&mut self, id: SubscriptionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
