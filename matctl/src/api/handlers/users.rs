//! HTTP handlers for user endpoints.

use crate::api::models::users::{CurrentUser, UserResponse};
use axum::response::Json;

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    summary = "Get current user",
    description = "Return the profile of the authenticated caller, including remaining free trials for guest accounts",
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_current_user(current_user: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(current_user.record()))
}
