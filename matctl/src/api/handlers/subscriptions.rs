//! HTTP handlers for subscription endpoints.

use crate::{
    api::models::{
        pagination::PaginatedResponse,
        subscriptions::{ListSubscriptionsQuery, SubscriptionCreate, SubscriptionResponse},
        users::CurrentUser,
    },
    db::{
        handlers::{Repository, SubscriptionFilter, Subscriptions},
        models::subscriptions::{PlanType, SubscriptionCreateDBRequest},
    },
    errors::{Error, Result},
    AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};

/// List subscriptions
#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "subscriptions",
    summary = "List subscriptions",
    description = "List the caller's subscriptions. Staff may pass user_id to inspect another member's subscriptions.",
    params(ListSubscriptionsQuery),
    responses(
        (status = 200, description = "Subscriptions", body = PaginatedResponse<SubscriptionResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - user_id filter requires staff"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Result<Json<PaginatedResponse<SubscriptionResponse>>> {
    let user_id = match query.user_id {
        Some(other) if other != current_user.id => {
            if !current_user.is_staff() {
                return Err(Error::Forbidden {
                    action: "view other members' subscriptions".to_string(),
                });
            }
            other
        }
        _ => current_user.id,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subscriptions::new(&mut conn);

    let filter = SubscriptionFilter {
        user_id: Some(user_id),
        status: query.status,
        skip: query.pagination.skip(),
        limit: query.pagination.limit(),
    };
    let subscriptions = repo.list(&filter).await?;

    let data = subscriptions.into_iter().map(SubscriptionResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, filter.skip, filter.limit)))
}

/// Create a subscription (staff only)
#[utoipa::path(
    post,
    path = "/subscriptions",
    tag = "subscriptions",
    summary = "Create a subscription",
    description = "Grant a member a new subscription. Session packs require a positive session count; time-based plans must not carry one.",
    request_body = SubscriptionCreate,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Bad request - invalid plan parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires staff role"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_subscription(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<SubscriptionCreate>,
) -> Result<(StatusCode, Json<SubscriptionResponse>)> {
    if !current_user.is_staff() {
        return Err(Error::Forbidden {
            action: "create subscriptions".to_string(),
        });
    }

    let remaining_sessions = match (data.plan_type, data.sessions) {
        (PlanType::SessionPack, Some(sessions)) if sessions > 0 => Some(sessions),
        (PlanType::SessionPack, _) => {
            return Err(Error::BadRequest {
                message: "Session packs require a positive number of sessions".to_string(),
            });
        }
        (PlanType::TimeBased, None) => None,
        (PlanType::TimeBased, Some(_)) => {
            return Err(Error::BadRequest {
                message: "Time-based plans do not carry a session count".to_string(),
            });
        }
    };

    if data.ends_on <= data.starts_on {
        return Err(Error::BadRequest {
            message: "Subscription must end after it starts".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subscriptions::new(&mut conn);

    let db_request = SubscriptionCreateDBRequest {
        user_id: data.user_id,
        plan_type: data.plan_type,
        remaining_sessions,
        starts_on: data.starts_on,
        ends_on: data.ends_on,
    };
    let subscription = repo.create(&db_request).await?;

    Ok((StatusCode::CREATED, Json(SubscriptionResponse::from(subscription))))
}
