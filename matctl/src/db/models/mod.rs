//! Database record structures matching table schemas.

pub mod occurrences;
pub mod reservations;
pub mod subscriptions;
pub mod users;
