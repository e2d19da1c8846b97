//! FIFO waitlist promotion.
//!
//! Runs inside the cancelling transaction, on the same connection: the
//! freed seat and the promotion commit together, and the `FOR UPDATE` lock
//! taken by [`Reservations::next_waiting`] serializes concurrent promoters
//! per occurrence.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{info, instrument, warn};

use crate::booking::lifecycle::apply_deduction;
use crate::booking::{validator, BookingContext};
use crate::db::errors::Result;
use crate::db::handlers::{Occurrences, Reservations};
use crate::db::models::reservations::ReservationDBResponse;
use crate::types::{abbrev_uuid, OccurrenceId};

/// Promote the first eligible waiting-list candidate on an occurrence.
///
/// Walks the queue in creation-time order. Candidates that no longer pass
/// validation (lapsed subscription, drained balance, deleted account) are
/// cancelled with a system reason and the walk continues, so one stale entry
/// never blocks the queue. Returns the promoted reservation, or `None` when
/// the queue is exhausted or the seat was refilled first.
#[instrument(skip(conn), err)]
pub async fn promote(
    conn: &mut PgConnection,
    occurrence_id: OccurrenceId,
    now: DateTime<Utc>,
) -> Result<Option<ReservationDBResponse>> {
    loop {
        let Some(candidate) = Reservations::new(conn).next_waiting(occurrence_id).await? else {
            return Ok(None);
        };

        let ctx = BookingContext::load_for_user_id(conn, candidate.user_id, occurrence_id, Some(candidate.id)).await?;
        let verdict = match &ctx {
            Some(ctx) => validator::validate(ctx),
            // Account deleted while queued
            None => {
                remove_candidate(conn, &candidate, "account no longer exists", now).await?;
                continue;
            }
        };

        let entitlement = match verdict {
            Ok(entitlement) => entitlement,
            Err(reason) => {
                remove_candidate(conn, &candidate, &reason.to_string(), now).await?;
                continue;
            }
        };

        // The seat freed by the caller may already have been retaken by a
        // direct booking; promotion never overbooks
        if !Occurrences::new(conn).try_claim_seat(occurrence_id).await? {
            return Ok(None);
        }

        let Some(deduction) = apply_deduction(conn, candidate.user_id, &entitlement).await? else {
            // Balance drained between validation and deduction
            Occurrences::new(conn).release_seat(occurrence_id).await?;
            remove_candidate(conn, &candidate, "no sessions remaining at promotion", now).await?;
            continue;
        };

        let promoted = Reservations::new(conn)
            .mark_promoted(
                candidate.id,
                deduction.subscription_id,
                deduction.session_deducted,
                deduction.sessions_deducted,
                deduction.is_free_trial,
                now,
            )
            .await?;
        Reservations::new(conn).renumber_waiting_positions(occurrence_id).await?;

        info!(
            reservation_id = %abbrev_uuid(&promoted.id),
            user_id = %abbrev_uuid(&promoted.user_id),
            "promoted from waiting list"
        );
        return Ok(Some(promoted));
    }
}

/// Drop an ineligible candidate from the queue and close the gap
async fn remove_candidate(
    conn: &mut PgConnection,
    candidate: &ReservationDBResponse,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    warn!(
        reservation_id = %abbrev_uuid(&candidate.id),
        user_id = %abbrev_uuid(&candidate.user_id),
        reason,
        "removing ineligible waiting-list entry"
    );
    Reservations::new(conn)
        .mark_cancelled(candidate.id, Some(&format!("removed from waiting list: {reason}")), 0, now)
        .await?;
    Reservations::new(conn)
        .renumber_waiting_positions(candidate.occurrence_id)
        .await?;
    Ok(())
}
