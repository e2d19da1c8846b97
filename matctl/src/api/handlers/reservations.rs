//! HTTP handlers for reservation endpoints.

use crate::{
    api::models::{
        pagination::PaginatedResponse,
        reservations::{ListReservationsQuery, ReservationCancel, ReservationCreate, ReservationResponse},
        users::CurrentUser,
    },
    booking::{self, CancelRequest},
    db::handlers::{ReservationFilter, Reservations},
    errors::{Error, Result},
    types::ReservationId,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

/// Book a class
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    summary = "Book a class",
    description = "Reserve a spot in a class occurrence. Returns a confirmed reservation while seats remain, otherwise a waiting-list entry.",
    request_body = ReservationCreate,
    responses(
        (status = 201, description = "Reservation created, confirmed or waitlisted", body = ReservationResponse),
        (status = 400, description = "Bad request - class not open for booking"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Occurrence not found"),
        (status = 409, description = "Conflict - a reservation for this class already exists"),
        (status = 422, description = "Booking denied - no usable entitlement"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_reservation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<ReservationCreate>,
) -> Result<(StatusCode, Json<ReservationResponse>)> {
    let reservation = booking::create_reservation(&state.db, &current_user.record(), data.occurrence_id).await?;
    Ok((StatusCode::CREATED, Json(ReservationResponse::from(reservation))))
}

/// List reservations
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    summary = "List reservations",
    description = "List the caller's reservations. Staff may pass user_id for one member or all=true for every member.",
    params(ListReservationsQuery),
    responses(
        (status = 200, description = "Reservations", body = PaginatedResponse<ReservationResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - user_id and all filters require staff"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_reservations(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListReservationsQuery>,
) -> Result<Json<PaginatedResponse<ReservationResponse>>> {
    let all = query.all.unwrap_or(false);
    let user_id = if all {
        if !current_user.is_staff() {
            return Err(Error::Forbidden {
                action: "list all reservations".to_string(),
            });
        }
        None
    } else {
        match query.user_id {
            Some(other) if other != current_user.id => {
                if !current_user.is_staff() {
                    return Err(Error::Forbidden {
                        action: "view other members' reservations".to_string(),
                    });
                }
                Some(other)
            }
            _ => Some(current_user.id),
        }
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Reservations::new(&mut conn);

    let filter = ReservationFilter {
        user_id,
        occurrence_id: query.occurrence_id,
        status: query.status,
        skip: query.pagination.skip(),
        limit: query.pagination.limit(),
    };
    let reservations = repo.list(&filter).await?;

    let data = reservations.into_iter().map(ReservationResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, filter.skip, filter.limit)))
}

/// Get a reservation
#[utoipa::path(
    get,
    path = "/reservations/{reservation_id}",
    tag = "reservations",
    summary = "Get a reservation",
    description = "Get one reservation. Non-staff callers can only see their own; other rows answer 404.",
    params(
        ("reservation_id" = String, Path, description = "Reservation ID", format = "uuid"),
    ),
    responses(
        (status = 200, description = "Reservation details", body = ReservationResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Reservation not found"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_reservation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reservation_id): Path<ReservationId>,
) -> Result<Json<ReservationResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Reservations::new(&mut conn);

    let not_found = || Error::NotFound {
        resource: "Reservation".to_string(),
        id: reservation_id.to_string(),
    };

    let reservation = repo.get_by_id(reservation_id).await?.ok_or_else(not_found)?;

    // Another member's reservation answers 404, not 403, so callers cannot
    // enumerate which IDs exist
    if reservation.user_id != current_user.id && !current_user.is_staff() {
        return Err(not_found());
    }

    Ok(Json(ReservationResponse::from(reservation)))
}

/// Cancel a reservation
#[utoipa::path(
    post,
    path = "/reservations/{reservation_id}/cancel",
    tag = "reservations",
    summary = "Cancel a reservation",
    description = "Cancel a confirmed or waitlisted reservation. Early enough cancellations refund the deducted session or trial, and a freed seat promotes the head of the waiting list.",
    params(
        ("reservation_id" = String, Path, description = "Reservation ID", format = "uuid"),
    ),
    request_body = ReservationCancel,
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationResponse),
        (status = 400, description = "Bad request - reservation already in a terminal state"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - not the owner and not staff"),
        (status = 404, description = "Reservation not found"),
    ),
    security(
        ("UserHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reservation_id): Path<ReservationId>,
    Json(data): Json<ReservationCancel>,
) -> Result<Json<ReservationResponse>> {
    let request = CancelRequest {
        reservation_id,
        reason: data.reason,
    };
    let cancelled = booking::cancel_reservation(
        &state.db,
        &current_user.record(),
        request,
        state.config.booking.refund_lead(),
    )
    .await?;
    Ok(Json(ReservationResponse::from(cancelled)))
}
