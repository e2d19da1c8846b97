//! The reservation and waiting-list lifecycle.
//!
//! This module is the business core of the service. Everything else in the
//! crate is plumbing around these three pieces:
//!
//! - [`validator`]: a pure decision function that, given a member and a
//!   target occurrence, decides whether a booking may proceed and with which
//!   entitlement. It performs no mutation and is safe to call repeatedly -
//!   it is reused verbatim during waitlist promotion.
//! - [`lifecycle`]: transactional create and cancel operations. A booking
//!   either confirms a seat (atomically claiming capacity and deducting a
//!   session or trial) or joins the waiting list. A cancellation applies the
//!   refund policy, releases the seat and triggers promotion - all inside a
//!   single transaction, so the reservation row, the accounting mutation and
//!   the capacity ledger commit or abort together.
//! - [`promoter`]: iterates the FIFO waiting queue after a confirmed seat
//!   frees up, re-validating each candidate and promoting the first eligible
//!   one.

pub mod lifecycle;
pub mod promoter;
pub mod validator;

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use thiserror::Error;
use utoipa::ToSchema;

use crate::db::errors::Result as DbResult;
use crate::db::handlers::{Repository, Reservations, Subscriptions, Users};
use crate::db::models::reservations::ReservationDBResponse;
use crate::db::models::subscriptions::SubscriptionDBResponse;
use crate::db::models::users::{Role, UserDBResponse};
use crate::types::{OccurrenceId, SubscriptionId, UserId};

pub use lifecycle::{cancel_reservation, create_reservation, refund_eligible, CancelRequest};
pub use promoter::promote;
pub use validator::validate;

/// What a successful validation entitles the booking to draw down.
///
/// Consumed uniformly by the deduction/refund logic in [`lifecycle`] and
/// [`promoter`] rather than re-branching on the user's role at every site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entitlement {
    /// Session-pack subscription: each confirmed booking costs one session
    SessionPack {
        subscription_id: SubscriptionId,
        remaining_sessions: i32,
    },
    /// Time-based subscription: unlimited bookings within the active period
    TimeBased { subscription_id: SubscriptionId },
    /// Guest free-trial balance: each confirmed booking costs one trial
    GuestTrial { remaining_trials: i32 },
}

/// Why a booking request was refused.
///
/// Entitlement reasons require real-world action (renew, top up); duplicate
/// reasons are permanent for the (user, occurrence) pair - in particular,
/// re-booking after a cancellation requires staff intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    #[error("no active subscription")]
    NoActiveSubscription,
    #[error("subscription has expired")]
    SubscriptionExpired,
    #[error("subscription is not active")]
    SubscriptionInactive,
    #[error("no sessions remaining on subscription")]
    NoSessionsRemaining,
    #[error("no free trials remaining")]
    NoTrialsRemaining,
    #[error("already booked into this class")]
    AlreadyBooked,
    #[error("already on the waiting list for this class")]
    AlreadyWaitlisted,
    #[error("already attended this class")]
    AlreadyAttended,
    #[error("a cancelled reservation exists for this class; contact staff to re-book")]
    PreviouslyCancelled,
}

impl DenyReason {
    /// True for the duplicate-reservation family of refusals
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DenyReason::AlreadyBooked
                | DenyReason::AlreadyWaitlisted
                | DenyReason::AlreadyAttended
                | DenyReason::PreviouslyCancelled
        )
    }
}

/// Everything the validator needs to decide a booking, fetched up front so
/// the decision itself stays pure and unit-testable.
#[derive(Debug, Clone)]
pub struct BookingContext {
    pub user: UserDBResponse,
    /// The user's current subscription, if any (ignored for guests)
    pub subscription: Option<SubscriptionDBResponse>,
    /// The user's existing reservation on the target occurrence, if any
    pub existing: Option<ReservationDBResponse>,
    /// Decision-time wall clock
    pub now: chrono::DateTime<chrono::Utc>,
}

impl BookingContext {
    /// Assemble the context for a booking decision.
    ///
    /// `exclude` removes one reservation from the duplicate check: during
    /// promotion the candidate's own waiting-list row must not count against
    /// them.
    pub async fn load(
        conn: &mut PgConnection,
        user: UserDBResponse,
        occurrence_id: OccurrenceId,
        exclude: Option<crate::types::ReservationId>,
    ) -> DbResult<Self> {
        let existing = Reservations::new(conn)
            .find_for_user_and_occurrence(user.id, occurrence_id)
            .await?
            .filter(|r| Some(r.id) != exclude);

        let subscription = if user.role == Role::Guest {
            None
        } else {
            Subscriptions::new(conn).current_for_user(user.id).await?
        };

        Ok(Self {
            user,
            subscription,
            existing,
            now: chrono::Utc::now(),
        })
    }

    /// Convenience loader when only the user id is at hand (promotion path)
    pub async fn load_for_user_id(
        conn: &mut PgConnection,
        user_id: UserId,
        occurrence_id: OccurrenceId,
        exclude: Option<crate::types::ReservationId>,
    ) -> DbResult<Option<Self>> {
        let Some(user) = Users::new(conn).get_by_id(user_id).await? else {
            return Ok(None);
        };
        Ok(Some(Self::load(conn, user, occurrence_id, exclude).await?))
    }
}
