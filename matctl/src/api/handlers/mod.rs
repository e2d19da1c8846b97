//! HTTP handlers for the booking API.

pub mod occurrences;
pub mod reservations;
pub mod subscriptions;
pub mod users;
