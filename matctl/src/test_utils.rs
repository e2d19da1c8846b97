//! Shared fixtures for unit and integration tests.

use crate::config::Config;
use crate::db::handlers::{Occurrences, Repository, Subscriptions, Users};
use crate::db::models::occurrences::{OccurrenceCreateDBRequest, OccurrenceDBResponse};
use crate::db::models::reservations::ReservationDBResponse;
use crate::db::models::subscriptions::{PlanType, SubscriptionCreateDBRequest, SubscriptionDBResponse};
use crate::db::models::users::{Role, UserCreateDBRequest, UserDBResponse};
use crate::types::{OccurrenceId, UserId};
use crate::{build_router, AppState};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Build a test server over the full router with default configuration
pub async fn create_test_app(pool: PgPool) -> axum_test::TestServer {
    let state = AppState {
        db: pool,
        config: Config::default(),
    };
    let router = build_router(state).expect("failed to build test router");
    axum_test::TestServer::new(router.into_make_service()).expect("Failed to create test server")
}

pub async fn create_test_user(pool: &PgPool, role: Role, free_trials: i32) -> UserDBResponse {
    let mut conn = pool.acquire().await.unwrap();
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: format!("{}@example.com", Uuid::new_v4()),
            display_name: None,
            role,
            free_trials_remaining: free_trials,
        })
        .await
        .unwrap()
}

pub async fn create_test_session_pack(pool: &PgPool, user_id: UserId, sessions: i32) -> SubscriptionDBResponse {
    let mut conn = pool.acquire().await.unwrap();
    Subscriptions::new(&mut conn)
        .create(&SubscriptionCreateDBRequest {
            user_id,
            plan_type: PlanType::SessionPack,
            remaining_sessions: Some(sessions),
            starts_on: Utc::now() - Duration::days(1),
            ends_on: Utc::now() + Duration::days(90),
        })
        .await
        .unwrap()
}

pub async fn create_test_time_based(pool: &PgPool, user_id: UserId) -> SubscriptionDBResponse {
    let mut conn = pool.acquire().await.unwrap();
    Subscriptions::new(&mut conn)
        .create(&SubscriptionCreateDBRequest {
            user_id,
            plan_type: PlanType::TimeBased,
            remaining_sessions: None,
            starts_on: Utc::now() - Duration::days(1),
            ends_on: Utc::now() + Duration::days(30),
        })
        .await
        .unwrap()
}

/// A scheduled occurrence far enough out that cancellations refund
pub async fn create_test_occurrence(pool: &PgPool, capacity: i32) -> OccurrenceDBResponse {
    create_test_occurrence_at(pool, capacity, Utc::now() + Duration::days(7)).await
}

pub async fn create_test_occurrence_at(pool: &PgPool, capacity: i32, starts_at: DateTime<Utc>) -> OccurrenceDBResponse {
    let naive = starts_at.naive_utc();
    let mut conn = pool.acquire().await.unwrap();
    Occurrences::new(&mut conn)
        .create(&OccurrenceCreateDBRequest {
            course_name: "BJJ Fundamentals".to_string(),
            instance_date: naive.date(),
            start_time: naive.time(),
            end_time: (naive + Duration::hours(1)).time(),
            location: Some("Mat A".to_string()),
            max_capacity: capacity,
        })
        .await
        .unwrap()
}

/// Insert a waiting-list row directly, with `reserved_at` staggered by
/// position so FIFO ordering is deterministic
pub async fn enqueue_test_waiting(
    pool: &PgPool,
    user_id: UserId,
    occurrence_id: OccurrenceId,
    position: i32,
) -> ReservationDBResponse {
    sqlx::query_as::<_, ReservationDBResponse>(
        "INSERT INTO reservations (user_id, occurrence_id, status, waiting_list_position, reserved_at)
         VALUES ($1, $2, 'waiting_list', $3, NOW() + make_interval(secs => $3::double precision))
         RETURNING *",
    )
    .bind(user_id)
    .bind(occurrence_id)
    .bind(position)
    .fetch_one(pool)
    .await
    .unwrap()
}
