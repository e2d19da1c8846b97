//! The booking decision function.
//!
//! Pure over a pre-fetched [`BookingContext`]: no queries, no mutation. The
//! same function decides initial bookings and waitlist-promotion
//! re-validation, so a candidate whose subscription lapsed while queued is
//! refused with the same reasons a fresh booking would be.

use crate::booking::{BookingContext, DenyReason, Entitlement};
use crate::db::models::reservations::ReservationStatus;
use crate::db::models::subscriptions::{PlanType, SubscriptionStatus};
use crate::db::models::users::Role;

/// Decide whether the booking described by `ctx` may proceed.
///
/// Checks run in a fixed order and short-circuit on the first failure:
/// entitlement first (trial balance for guests, subscription state for
/// everyone else), then the duplicate-reservation check. On success the
/// resolved [`Entitlement`] is returned so the caller can deduct without
/// re-querying.
pub fn validate(ctx: &BookingContext) -> Result<Entitlement, DenyReason> {
    let entitlement = resolve_entitlement(ctx)?;

    if let Some(existing) = &ctx.existing {
        return Err(match existing.status {
            ReservationStatus::Confirmed => DenyReason::AlreadyBooked,
            ReservationStatus::WaitingList => DenyReason::AlreadyWaitlisted,
            ReservationStatus::Completed => DenyReason::AlreadyAttended,
            // Re-booking after cancellation needs staff intervention
            ReservationStatus::Cancelled => DenyReason::PreviouslyCancelled,
        });
    }

    Ok(entitlement)
}

fn resolve_entitlement(ctx: &BookingContext) -> Result<Entitlement, DenyReason> {
    if ctx.user.role == Role::Guest {
        if ctx.user.free_trials_remaining <= 0 {
            return Err(DenyReason::NoTrialsRemaining);
        }
        return Ok(Entitlement::GuestTrial {
            remaining_trials: ctx.user.free_trials_remaining,
        });
    }

    let Some(subscription) = &ctx.subscription else {
        return Err(DenyReason::NoActiveSubscription);
    };
    if subscription.ends_on < ctx.now {
        return Err(DenyReason::SubscriptionExpired);
    }
    if subscription.status != SubscriptionStatus::Active {
        return Err(DenyReason::SubscriptionInactive);
    }

    match subscription.plan_type {
        PlanType::SessionPack => {
            let remaining = subscription.remaining_sessions.unwrap_or(0);
            if remaining <= 0 {
                return Err(DenyReason::NoSessionsRemaining);
            }
            Ok(Entitlement::SessionPack {
                subscription_id: subscription.id,
                remaining_sessions: remaining,
            })
        }
        PlanType::TimeBased => Ok(Entitlement::TimeBased {
            subscription_id: subscription.id,
        }),
    }
}
