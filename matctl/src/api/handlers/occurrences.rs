//! HTTP handlers for class occurrence endpoints.

use crate::{
    api::models::{
        occurrences::{ListOccurrencesQuery, OccurrenceResponse, WaitlistEntryResponse},
        pagination::PaginatedResponse,
        users::CurrentUser,
    },
    db::handlers::{OccurrenceFilter, Occurrences, Repository, Reservations},
    errors::{Error, Result},
    types::OccurrenceId,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};

/// List class occurrences
#[utoipa::path(
    get,
    path = "/occurrences",
    tag = "occurrences",
    summary = "List class occurrences",
    description = "Browse the class schedule, optionally restricted to a date range",
    params(ListOccurrencesQuery),
    responses(
        (status = 200, description = "Class occurrences", body = PaginatedResponse<OccurrenceResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_occurrences(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListOccurrencesQuery>,
) -> Result<Json<PaginatedResponse<OccurrenceResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Occurrences::new(&mut conn);

    let filter = OccurrenceFilter {
        from: query.from,
        to: query.to,
        status: query.status,
        skip: query.pagination.skip(),
        limit: query.pagination.limit(),
    };
    let occurrences = repo.list(&filter).await?;

    let data = occurrences.into_iter().map(OccurrenceResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, filter.skip, filter.limit)))
}

/// Get a class occurrence
#[utoipa::path(
    get,
    path = "/occurrences/{occurrence_id}",
    tag = "occurrences",
    summary = "Get a class occurrence",
    params(
        ("occurrence_id" = String, Path, description = "Occurrence ID", format = "uuid"),
    ),
    responses(
        (status = 200, description = "Occurrence details", body = OccurrenceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Occurrence not found"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_occurrence(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(occurrence_id): Path<OccurrenceId>,
) -> Result<Json<OccurrenceResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Occurrences::new(&mut conn);

    let occurrence = repo.get_by_id(occurrence_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Occurrence".to_string(),
        id: occurrence_id.to_string(),
    })?;

    Ok(Json(OccurrenceResponse::from(occurrence)))
}

/// Get the waiting list for an occurrence (staff only)
#[utoipa::path(
    get,
    path = "/occurrences/{occurrence_id}/waitlist",
    tag = "occurrences",
    summary = "Get the waiting list",
    description = "The ordered waiting list for a class, next in line first (staff only)",
    params(
        ("occurrence_id" = String, Path, description = "Occurrence ID", format = "uuid"),
    ),
    responses(
        (status = 200, description = "Waiting list in queue order", body = Vec<WaitlistEntryResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires staff role"),
        (status = 404, description = "Occurrence not found"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_waitlist(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(occurrence_id): Path<OccurrenceId>,
) -> Result<Json<Vec<WaitlistEntryResponse>>> {
    if !current_user.is_staff() {
        return Err(Error::Forbidden {
            action: "view the waiting list".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    Occurrences::new(&mut conn)
        .get_by_id(occurrence_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Occurrence".to_string(),
            id: occurrence_id.to_string(),
        })?;

    let entries = Reservations::new(&mut conn).waitlist(occurrence_id).await?;
    Ok(Json(entries.into_iter().map(WaitlistEntryResponse::from).collect()))
}
