use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::Repository;
use crate::db::models::users::{Role, UserCreateDBRequest, UserDBResponse};
use crate::types::UserId;

/// Filter for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub skip: i64,
    pub limit: i64,
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(user)
    }

    /// Consume one free trial. Guarded so the balance never goes negative:
    /// returns false when no trials were left to deduct.
    #[instrument(skip(self), err)]
    pub async fn deduct_free_trial(&mut self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET free_trials_remaining = free_trials_remaining - 1
             WHERE id = $1 AND free_trials_remaining > 0",
        )
        .bind(user_id)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Return previously consumed free trials on a refund-eligible cancellation
    #[instrument(skip(self), err)]
    pub async fn refund_free_trials(&mut self, user_id: UserId, amount: i32) -> Result<()> {
        sqlx::query("UPDATE users SET free_trials_remaining = free_trials_remaining + $2 WHERE id = $1")
            .bind(user_id)
            .bind(amount)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Repository for Users<'_> {
    type CreateRequest = UserCreateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    async fn create(&mut self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            "INSERT INTO users (email, display_name, role, free_trials_remaining)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(request.role)
        .bind(request.free_trials_remaining)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(user)
    }

    async fn get_by_id(&mut self, id: UserId) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(user)
    }

    async fn list(&mut self, filter: &UserFilter) -> Result<Vec<UserDBResponse>> {
        let users = sqlx::query_as::<_, UserDBResponse>(
            "SELECT * FROM users
             WHERE ($1::TEXT IS NULL OR role = $1)
             ORDER BY created_at
             OFFSET $2 LIMIT $3",
        )
        .bind(filter.role)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(users)
    }

    async fn delete(&mut self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
