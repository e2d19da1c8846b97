//! Authentication.
//!
//! Identity management is external: the service sits behind a trusted
//! reverse proxy (or gym front-desk gateway) that authenticates members and
//! forwards the member's UUID in the `x-matctl-user` header. This module
//! resolves that header to a database user and exposes it to handlers via
//! the [`CurrentUser`](crate::api::models::users::CurrentUser) extractor.
//!
//! Authorization is role-based and coarse: guests and members act on their
//! own records, staff additionally read other members' reservations and
//! waitlists, create subscriptions and cancel on members' behalf.

pub mod current_user;

/// Name of the trusted proxy header carrying the authenticated member's UUID
pub const USER_HEADER: &str = "x-matctl-user";
