//! Repository implementations for database access.
//!
//! This module provides repository structs for each major entity in the system.
//! Repositories follow a consistent pattern and implement the [`Repository`]
//! trait where the plain CRUD shape fits.
//!
//! # Design Pattern
//!
//! Each repository:
//! - Wraps a SQLx connection or transaction
//! - Provides strongly-typed operations
//! - Handles query construction and parameter binding
//! - Returns domain models from [`crate::db::models`]
//! - Uses the connection's transaction for ACID guarantees
//!
//! # Available Repositories
//!
//! - [`Users`]: Member/guest accounts and free-trial accounting
//! - [`Subscriptions`]: Subscription records and session-pack accounting
//! - [`Occurrences`]: Class occurrences and the capacity ledger
//! - [`Reservations`]: Reservation rows and waiting-list queries
//!
//! [`Reservations`] does not implement [`Repository`]: reservations are never
//! created or deleted directly through CRUD - their lifecycle is owned by
//! [`crate::booking`].

pub mod occurrences;
pub mod repository;
pub mod reservations;
pub mod subscriptions;
pub mod users;

pub use occurrences::{OccurrenceFilter, Occurrences};
pub use repository::Repository;
pub use reservations::{ReservationFilter, Reservations};
pub use subscriptions::{SubscriptionFilter, Subscriptions};
pub use users::Users;
