//! Extractor resolving the trusted proxy header to an authenticated user.

use crate::{
    api::models::users::CurrentUser,
    auth::USER_HEADER,
    db::errors::DbError,
    db::handlers::{Repository, Users},
    errors::Error,
    types::UserId,
    AppState,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::trace;

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| Error::Unauthenticated {
                message: Some(format!("Missing {USER_HEADER} header")),
            })?;

        let user_id: UserId = header.parse().map_err(|_| Error::Unauthenticated {
            message: Some(format!("{USER_HEADER} header is not a valid UUID")),
        })?;

        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        let user = Users::new(&mut conn)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| Error::Unauthenticated {
                message: Some("Unknown user".to_string()),
            })?;

        trace!(user_id = %user.id, role = ?user.role, "authenticated via proxy header");
        Ok(CurrentUser::from(user))
    }
}
