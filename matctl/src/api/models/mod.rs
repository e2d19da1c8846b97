//! API request/response models.

pub mod occurrences;
pub mod pagination;
pub mod reservations;
pub mod subscriptions;
pub mod users;
