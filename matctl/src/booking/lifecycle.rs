//! Transactional create and cancel operations for reservations.
//!
//! Both entry points open a single transaction and run every mutation inside
//! it, so the reservation row, the capacity ledger and the session/trial
//! accounting always commit or roll back together. The capacity check is the
//! atomic claim in [`Occurrences::try_claim_seat`]: losing the race for the
//! last seat lands the booking on the waiting list instead of overbooking.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use crate::booking::{promoter, validator, BookingContext, DenyReason, Entitlement};
use crate::db::errors::{DbError, Result as DbResult};
use crate::db::handlers::{Occurrences, Repository, Reservations, Subscriptions, Users};
use crate::db::models::occurrences::{OccurrenceDBResponse, OccurrenceStatus};
use crate::db::models::reservations::{ReservationCreateDBRequest, ReservationDBResponse, ReservationStatus};
use crate::db::models::users::{Role, UserDBResponse};
use crate::errors::{Error, Result};
use crate::types::{abbrev_uuid, OccurrenceId, ReservationId, SubscriptionId, UserId};

/// Cancellation parameters, assembled by the API layer
#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub reservation_id: ReservationId,
    pub reason: Option<String>,
}

/// Accounting outcome of drawing down an entitlement, recorded on the
/// reservation row so a later cancellation can refund exactly what was taken.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deduction {
    pub subscription_id: Option<SubscriptionId>,
    pub session_deducted: bool,
    pub sessions_deducted: i32,
    pub is_free_trial: bool,
}

impl Deduction {
    fn none_for(entitlement: &Entitlement) -> Self {
        let subscription_id = match entitlement {
            Entitlement::SessionPack { subscription_id, .. } | Entitlement::TimeBased { subscription_id } => {
                Some(*subscription_id)
            }
            Entitlement::GuestTrial { .. } => None,
        };
        Self {
            subscription_id,
            session_deducted: false,
            sessions_deducted: 0,
            is_free_trial: false,
        }
    }
}

/// Draw down the entitlement for one confirmed seat.
///
/// Returns `None` when the guarded decrement lost a race and the balance hit
/// zero between validation and deduction; the caller must give the seat back.
pub(crate) async fn apply_deduction(
    conn: &mut PgConnection,
    user_id: UserId,
    entitlement: &Entitlement,
) -> DbResult<Option<Deduction>> {
    match entitlement {
        Entitlement::SessionPack { subscription_id, .. } => {
            if !Subscriptions::new(conn).deduct_session(*subscription_id).await? {
                return Ok(None);
            }
            Ok(Some(Deduction {
                subscription_id: Some(*subscription_id),
                session_deducted: true,
                sessions_deducted: 1,
                is_free_trial: false,
            }))
        }
        Entitlement::TimeBased { subscription_id } => Ok(Some(Deduction {
            subscription_id: Some(*subscription_id),
            session_deducted: false,
            sessions_deducted: 0,
            is_free_trial: false,
        })),
        Entitlement::GuestTrial { .. } => {
            if !Users::new(conn).deduct_free_trial(user_id).await? {
                return Ok(None);
            }
            Ok(Some(Deduction {
                subscription_id: None,
                session_deducted: false,
                sessions_deducted: 1,
                is_free_trial: true,
            }))
        }
    }
}

/// Give back what [`apply_deduction`] took
pub(crate) async fn revert_deduction(
    conn: &mut PgConnection,
    user_id: UserId,
    reservation: &ReservationDBResponse,
    amount: i32,
) -> DbResult<()> {
    if amount <= 0 {
        return Ok(());
    }
    if reservation.is_free_trial {
        Users::new(conn).refund_free_trials(user_id, amount).await?;
    } else if let Some(subscription_id) = reservation.subscription_id {
        Subscriptions::new(conn).refund_sessions(subscription_id, amount).await?;
    }
    Ok(())
}

/// Whether a cancellation at `now` is early enough to refund the deducted
/// session or trial. The boundary is inclusive: exactly `lead` before the
/// class starts still refunds.
pub fn refund_eligible(now: DateTime<Utc>, lead: Duration, starts_at: DateTime<Utc>) -> bool {
    now + lead <= starts_at
}

/// Book `user` into an occurrence: a confirmed seat when capacity allows,
/// a waiting-list entry when the class is full.
#[instrument(skip(pool, user), fields(user_id = %abbrev_uuid(&user.id)), err)]
pub async fn create_reservation(
    pool: &PgPool,
    user: &UserDBResponse,
    occurrence_id: OccurrenceId,
) -> Result<ReservationDBResponse> {
    let now = Utc::now();
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    let occurrence = require_bookable_occurrence(&mut tx, occurrence_id, now).await?;

    let ctx = BookingContext::load(&mut tx, user.clone(), occurrence_id, None).await?;
    let entitlement = validator::validate(&ctx)?;

    let mut claimed = Occurrences::new(&mut tx).try_claim_seat(occurrence_id).await?;
    if !claimed {
        // The class looked full. Take the occurrence row lock so concurrent
        // joiners compute queue positions serially, then re-check the claim:
        // a seat may have been released since the first attempt
        Occurrences::new(&mut tx).lock_for_update(occurrence_id).await?;
        claimed = Occurrences::new(&mut tx).try_claim_seat(occurrence_id).await?;
    }

    let reservation = if claimed {
        let Some(deduction) = apply_deduction(&mut tx, user.id, &entitlement).await? else {
            // Balance drained between validation and deduction; the claim
            // rolls back with the transaction
            tx.rollback().await.map_err(DbError::from)?;
            return Err(balance_denial(&entitlement).into());
        };
        Reservations::new(&mut tx)
            .insert(&ReservationCreateDBRequest {
                user_id: user.id,
                occurrence_id,
                status: ReservationStatus::Confirmed,
                waiting_list_position: None,
                subscription_id: deduction.subscription_id,
                session_deducted: deduction.session_deducted,
                sessions_deducted: deduction.sessions_deducted,
                is_free_trial: deduction.is_free_trial,
            })
            .await?
    } else {
        let position = Reservations::new(&mut tx).next_waiting_position(occurrence_id).await?;
        let deduction = Deduction::none_for(&entitlement);
        Reservations::new(&mut tx)
            .insert(&ReservationCreateDBRequest {
                user_id: user.id,
                occurrence_id,
                status: ReservationStatus::WaitingList,
                waiting_list_position: Some(position),
                subscription_id: deduction.subscription_id,
                session_deducted: false,
                sessions_deducted: 0,
                is_free_trial: false,
            })
            .await?
    };

    tx.commit().await.map_err(DbError::from)?;
    info!(
        reservation_id = %abbrev_uuid(&reservation.id),
        status = ?reservation.status,
        course = %occurrence.course_name,
        "reservation created"
    );
    Ok(reservation)
}

/// Cancel a reservation on behalf of `actor`.
///
/// Members cancel their own reservations; staff may cancel anyone's. A
/// confirmed cancellation refunds the deducted session or trial when made at
/// least `refund_lead` before the class starts, releases the seat and runs
/// the waitlist promoter. A waiting-list cancellation just leaves the queue,
/// and the remaining positions are renumbered to stay gapless.
#[instrument(skip(pool, actor, request), fields(reservation_id = %abbrev_uuid(&request.reservation_id)), err)]
pub async fn cancel_reservation(
    pool: &PgPool,
    actor: &UserDBResponse,
    request: CancelRequest,
    refund_lead: Duration,
) -> Result<ReservationDBResponse> {
    let now = Utc::now();
    let mut tx = pool.begin().await.map_err(DbError::from)?;

    let reservation = Reservations::new(&mut tx)
        .get_by_id_for_update(request.reservation_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Reservation".to_string(),
            id: request.reservation_id.to_string(),
        })?;

    if reservation.user_id != actor.id && actor.role != Role::Staff {
        return Err(Error::Forbidden {
            action: "cancel this reservation".to_string(),
        });
    }

    match reservation.status {
        ReservationStatus::Confirmed | ReservationStatus::WaitingList => {}
        ReservationStatus::Cancelled => {
            return Err(Error::BadRequest {
                message: "Reservation is already cancelled".to_string(),
            })
        }
        ReservationStatus::Completed => {
            return Err(Error::BadRequest {
                message: "Reservation has already been completed".to_string(),
            })
        }
    }

    let occurrence = Occurrences::new(&mut tx)
        .get_by_id(reservation.occurrence_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Class occurrence".to_string(),
            id: reservation.occurrence_id.to_string(),
        })?;

    let was_confirmed = reservation.status == ReservationStatus::Confirmed;
    let refund_amount = if was_confirmed && refund_eligible(now, refund_lead, occurrence.starts_at()) {
        reservation.sessions_deducted
    } else {
        0
    };

    let cancelled = Reservations::new(&mut tx)
        .mark_cancelled(reservation.id, request.reason.as_deref(), refund_amount, now)
        .await?;
    revert_deduction(&mut tx, reservation.user_id, &reservation, refund_amount).await?;

    if was_confirmed {
        Occurrences::new(&mut tx).release_seat(occurrence.id).await?;
        promoter::promote(&mut tx, occurrence.id, now).await?;
    } else {
        // Left the queue from the middle; close the gap
        Reservations::new(&mut tx).renumber_waiting_positions(occurrence.id).await?;
    }

    tx.commit().await.map_err(DbError::from)?;
    info!(
        refund_amount,
        was_confirmed,
        course = %occurrence.course_name,
        "reservation cancelled"
    );
    Ok(cancelled)
}

async fn require_bookable_occurrence(
    conn: &mut PgConnection,
    occurrence_id: OccurrenceId,
    now: DateTime<Utc>,
) -> Result<OccurrenceDBResponse> {
    let occurrence = Occurrences::new(conn)
        .get_by_id(occurrence_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Class occurrence".to_string(),
            id: occurrence_id.to_string(),
        })?;
    if occurrence.status != OccurrenceStatus::Scheduled {
        return Err(Error::BadRequest {
            message: "Class is not open for booking".to_string(),
        });
    }
    if occurrence.starts_at() <= now {
        return Err(Error::BadRequest {
            message: "Class has already started".to_string(),
        });
    }
    Ok(occurrence)
}

fn balance_denial(entitlement: &Entitlement) -> DenyReason {
    match entitlement {
        Entitlement::GuestTrial { .. } => DenyReason::NoTrialsRemaining,
        _ => DenyReason::NoSessionsRemaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::subscriptions::PlanType;
    use crate::test_utils::{
        create_test_occurrence, create_test_occurrence_at, create_test_session_pack, create_test_time_based,
        create_test_user,
    };
    use sqlx::PgPool;

    #[test]
    fn refund_boundary_is_inclusive() {
        let starts_at = "2026-03-10T18:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let lead = Duration::hours(2);

        let early = "2026-03-10T15:59:00Z".parse::<DateTime<Utc>>().unwrap();
        let exact = "2026-03-10T16:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let late = "2026-03-10T16:01:00Z".parse::<DateTime<Utc>>().unwrap();

        assert!(refund_eligible(early, lead, starts_at));
        assert!(refund_eligible(exact, lead, starts_at));
        assert!(!refund_eligible(late, lead, starts_at));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_confirmed_booking_deducts_session_and_claims_seat(pool: PgPool) {
        let member = create_test_user(&pool, Role::Member, 0).await;
        let pack = create_test_session_pack(&pool, member.id, 5).await;
        let occurrence = create_test_occurrence(&pool, 10).await;

        let reservation = create_reservation(&pool, &member, occurrence.id).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.subscription_id, Some(pack.id));
        assert!(reservation.session_deducted);
        assert_eq!(reservation.sessions_deducted, 1);

        let mut conn = pool.acquire().await.unwrap();
        let sub = Subscriptions::new(&mut conn).get_by_id(pack.id).await.unwrap().unwrap();
        assert_eq!(sub.remaining_sessions, Some(4));
        let occ = Occurrences::new(&mut conn).get_by_id(occurrence.id).await.unwrap().unwrap();
        assert_eq!(occ.current_reservations, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_time_based_booking_deducts_nothing(pool: PgPool) {
        let member = create_test_user(&pool, Role::Member, 0).await;
        let sub = create_test_time_based(&pool, member.id).await;
        assert_eq!(sub.plan_type, PlanType::TimeBased);
        let occurrence = create_test_occurrence(&pool, 10).await;

        let reservation = create_reservation(&pool, &member, occurrence.id).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert!(!reservation.session_deducted);
        assert_eq!(reservation.sessions_deducted, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_guest_booking_consumes_trial(pool: PgPool) {
        let guest = create_test_user(&pool, Role::Guest, 2).await;
        let occurrence = create_test_occurrence(&pool, 10).await;

        let reservation = create_reservation(&pool, &guest, occurrence.id).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert!(reservation.is_free_trial);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_by_id(guest.id).await.unwrap().unwrap();
        assert_eq!(user.free_trials_remaining, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_full_class_sends_booking_to_waitlist(pool: PgPool) {
        let a = create_test_user(&pool, Role::Member, 0).await;
        let b = create_test_user(&pool, Role::Member, 0).await;
        create_test_time_based(&pool, a.id).await;
        let pack_b = create_test_session_pack(&pool, b.id, 3).await;
        let occurrence = create_test_occurrence(&pool, 1).await;

        let first = create_reservation(&pool, &a, occurrence.id).await.unwrap();
        assert_eq!(first.status, ReservationStatus::Confirmed);

        let second = create_reservation(&pool, &b, occurrence.id).await.unwrap();
        assert_eq!(second.status, ReservationStatus::WaitingList);
        assert_eq!(second.waiting_list_position, Some(1));
        // Queueing costs nothing until a seat is actually confirmed
        assert!(!second.session_deducted);

        let mut conn = pool.acquire().await.unwrap();
        let sub = Subscriptions::new(&mut conn).get_by_id(pack_b.id).await.unwrap().unwrap();
        assert_eq!(sub.remaining_sessions, Some(3));
        let occ = Occurrences::new(&mut conn).get_by_id(occurrence.id).await.unwrap().unwrap();
        assert_eq!(occ.current_reservations, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_booking_rejected(pool: PgPool) {
        let member = create_test_user(&pool, Role::Member, 0).await;
        create_test_time_based(&pool, member.id).await;
        let occurrence = create_test_occurrence(&pool, 10).await;

        create_reservation(&pool, &member, occurrence.id).await.unwrap();
        let err = create_reservation(&pool, &member, occurrence.id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::BookingDenied {
                reason: DenyReason::AlreadyBooked
            }
        ));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rebooking_after_cancellation_rejected(pool: PgPool) {
        let member = create_test_user(&pool, Role::Member, 0).await;
        create_test_time_based(&pool, member.id).await;
        let occurrence = create_test_occurrence(&pool, 10).await;

        let reservation = create_reservation(&pool, &member, occurrence.id).await.unwrap();
        cancel_reservation(
            &pool,
            &member,
            CancelRequest {
                reservation_id: reservation.id,
                reason: None,
            },
            Duration::hours(2),
        )
        .await
        .unwrap();

        let err = create_reservation(&pool, &member, occurrence.id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::BookingDenied {
                reason: DenyReason::PreviouslyCancelled
            }
        ));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_early_cancellation_refunds_session(pool: PgPool) {
        let member = create_test_user(&pool, Role::Member, 0).await;
        let pack = create_test_session_pack(&pool, member.id, 5).await;
        // Starts a week out, comfortably past any refund lead
        let occurrence = create_test_occurrence(&pool, 10).await;

        let reservation = create_reservation(&pool, &member, occurrence.id).await.unwrap();
        let cancelled = cancel_reservation(
            &pool,
            &member,
            CancelRequest {
                reservation_id: reservation.id,
                reason: Some("schedule clash".to_string()),
            },
            Duration::hours(2),
        )
        .await
        .unwrap();

        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(cancelled.refund_amount, 1);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("schedule clash"));

        let mut conn = pool.acquire().await.unwrap();
        let sub = Subscriptions::new(&mut conn).get_by_id(pack.id).await.unwrap().unwrap();
        assert_eq!(sub.remaining_sessions, Some(5));
        let occ = Occurrences::new(&mut conn).get_by_id(occurrence.id).await.unwrap().unwrap();
        assert_eq!(occ.current_reservations, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_late_cancellation_forfeits_session(pool: PgPool) {
        let member = create_test_user(&pool, Role::Member, 0).await;
        let pack = create_test_session_pack(&pool, member.id, 5).await;
        // Starts in one hour, inside the two-hour refund lead
        let occurrence = create_test_occurrence_at(&pool, 10, Utc::now() + Duration::hours(1)).await;

        let reservation = create_reservation(&pool, &member, occurrence.id).await.unwrap();
        let cancelled = cancel_reservation(
            &pool,
            &member,
            CancelRequest {
                reservation_id: reservation.id,
                reason: None,
            },
            Duration::hours(2),
        )
        .await
        .unwrap();

        assert_eq!(cancelled.refund_amount, 0);

        let mut conn = pool.acquire().await.unwrap();
        let sub = Subscriptions::new(&mut conn).get_by_id(pack.id).await.unwrap().unwrap();
        assert_eq!(sub.remaining_sessions, Some(4));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cancelling_anothers_reservation_is_forbidden(pool: PgPool) {
        let member = create_test_user(&pool, Role::Member, 0).await;
        let other = create_test_user(&pool, Role::Member, 0).await;
        create_test_time_based(&pool, member.id).await;
        let occurrence = create_test_occurrence(&pool, 10).await;

        let reservation = create_reservation(&pool, &member, occurrence.id).await.unwrap();
        let err = cancel_reservation(
            &pool,
            &other,
            CancelRequest {
                reservation_id: reservation.id,
                reason: None,
            },
            Duration::hours(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_staff_can_cancel_anyones_reservation(pool: PgPool) {
        let member = create_test_user(&pool, Role::Member, 0).await;
        let staff = create_test_user(&pool, Role::Staff, 0).await;
        create_test_time_based(&pool, member.id).await;
        let occurrence = create_test_occurrence(&pool, 10).await;

        let reservation = create_reservation(&pool, &member, occurrence.id).await.unwrap();
        let cancelled = cancel_reservation(
            &pool,
            &staff,
            CancelRequest {
                reservation_id: reservation.id,
                reason: Some("requested at the front desk".to_string()),
            },
            Duration::hours(2),
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_waitlist_cancellation_renumbers_queue(pool: PgPool) {
        let a = create_test_user(&pool, Role::Member, 0).await;
        let b = create_test_user(&pool, Role::Member, 0).await;
        let c = create_test_user(&pool, Role::Member, 0).await;
        for user in [&a, &b, &c] {
            create_test_time_based(&pool, user.id).await;
        }
        let occurrence = create_test_occurrence(&pool, 1).await;

        create_reservation(&pool, &a, occurrence.id).await.unwrap();
        let queued_b = create_reservation(&pool, &b, occurrence.id).await.unwrap();
        let queued_c = create_reservation(&pool, &c, occurrence.id).await.unwrap();
        assert_eq!(queued_b.waiting_list_position, Some(1));
        assert_eq!(queued_c.waiting_list_position, Some(2));

        cancel_reservation(
            &pool,
            &b,
            CancelRequest {
                reservation_id: queued_b.id,
                reason: None,
            },
            Duration::hours(2),
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let remaining = Reservations::new(&mut conn).waitlist(occurrence.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, queued_c.id);
        assert_eq!(remaining[0].waiting_list_position, Some(1));
        // No seat was held, so the ledger is untouched
        let occ = Occurrences::new(&mut conn).get_by_id(occurrence.id).await.unwrap().unwrap();
        assert_eq!(occ.current_reservations, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_end_to_end_cancel_promotes_waiting_member(pool: PgPool) {
        let a = create_test_user(&pool, Role::Member, 0).await;
        let b = create_test_user(&pool, Role::Member, 0).await;
        let pack_a = create_test_session_pack(&pool, a.id, 5).await;
        let pack_b = create_test_session_pack(&pool, b.id, 5).await;
        let occurrence = create_test_occurrence(&pool, 1).await;

        let res_a = create_reservation(&pool, &a, occurrence.id).await.unwrap();
        assert_eq!(res_a.status, ReservationStatus::Confirmed);

        let res_b = create_reservation(&pool, &b, occurrence.id).await.unwrap();
        assert_eq!(res_b.status, ReservationStatus::WaitingList);
        assert_eq!(res_b.waiting_list_position, Some(1));

        cancel_reservation(
            &pool,
            &a,
            CancelRequest {
                reservation_id: res_a.id,
                reason: None,
            },
            Duration::hours(2),
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let promoted = Reservations::new(&mut conn).get_by_id(res_b.id).await.unwrap().unwrap();
        assert_eq!(promoted.status, ReservationStatus::Confirmed);
        assert_eq!(promoted.waiting_list_position, None);
        assert!(promoted.promoted_at.is_some());
        assert!(promoted.session_deducted);

        // A refunded, B charged, seat handed over
        let sub_a = Subscriptions::new(&mut conn).get_by_id(pack_a.id).await.unwrap().unwrap();
        assert_eq!(sub_a.remaining_sessions, Some(5));
        let sub_b = Subscriptions::new(&mut conn).get_by_id(pack_b.id).await.unwrap().unwrap();
        assert_eq!(sub_b.remaining_sessions, Some(4));
        let occ = Occurrences::new(&mut conn).get_by_id(occurrence.id).await.unwrap().unwrap();
        assert_eq!(occ.current_reservations, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_bookings_never_overshoot_capacity(pool: PgPool) {
        let occurrence = create_test_occurrence(&pool, 2).await;
        let mut handles = Vec::new();
        for _ in 0..6 {
            let user = create_test_user(&pool, Role::Member, 0).await;
            create_test_time_based(&pool, user.id).await;
            let pool = pool.clone();
            let occurrence_id = occurrence.id;
            handles.push(tokio::spawn(async move {
                create_reservation(&pool, &user, occurrence_id).await.unwrap()
            }));
        }

        let mut confirmed = 0;
        let mut waitlisted = 0;
        for handle in handles {
            match handle.await.unwrap().status {
                ReservationStatus::Confirmed => confirmed += 1,
                ReservationStatus::WaitingList => waitlisted += 1,
                other => panic!("unexpected status {other:?}"),
            }
        }
        assert_eq!(confirmed, 2);
        assert_eq!(waitlisted, 4);

        let mut conn = pool.acquire().await.unwrap();
        let occ = Occurrences::new(&mut conn).get_by_id(occurrence.id).await.unwrap().unwrap();
        assert_eq!(occ.current_reservations, 2);
        assert_eq!(
            Reservations::new(&mut conn).count_confirmed(occurrence.id).await.unwrap(),
            2
        );
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_waitlist_joins_get_contiguous_positions(pool: PgPool) {
        let occupant = create_test_user(&pool, Role::Member, 0).await;
        create_test_time_based(&pool, occupant.id).await;
        let occurrence = create_test_occurrence(&pool, 1).await;
        create_reservation(&pool, &occupant, occurrence.id).await.unwrap();

        // Race eight joins against the already-full class
        let mut handles = Vec::new();
        for _ in 0..8 {
            let user = create_test_user(&pool, Role::Member, 0).await;
            create_test_time_based(&pool, user.id).await;
            let pool = pool.clone();
            let occurrence_id = occurrence.id;
            handles.push(tokio::spawn(async move {
                create_reservation(&pool, &user, occurrence_id).await.unwrap()
            }));
        }
        for handle in handles {
            let reservation = handle.await.unwrap();
            assert_eq!(reservation.status, ReservationStatus::WaitingList);
        }

        // Positions must come out dense from 1, no duplicates and no gaps
        let mut conn = pool.acquire().await.unwrap();
        let waitlist = Reservations::new(&mut conn).waitlist(occurrence.id).await.unwrap();
        let mut positions: Vec<i32> = waitlist.iter().filter_map(|r| r.waiting_list_position).collect();
        positions.sort_unstable();
        assert_eq!(positions, (1..=8).collect::<Vec<i32>>());
    }
}
