//! API request/response models for users.

use crate::db::models::users::{Role, UserDBResponse};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User profile as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    /// Free trial classes this account may still book (guests only)
    pub free_trials_remaining: i32,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            display_name: db.display_name,
            role: db.role,
            free_trials_remaining: db.free_trials_remaining,
            created_at: db.created_at,
        }
    }
}

/// The authenticated caller, resolved from the trusted proxy header.
///
/// Carries the full account record so handlers can pass it straight into the
/// booking core without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub free_trials_remaining: i32,
    pub created_at: DateTime<Utc>,
}

impl CurrentUser {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    /// The underlying account record, as the booking core expects it
    pub fn record(&self) -> UserDBResponse {
        UserDBResponse {
            id: self.id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            free_trials_remaining: self.free_trials_remaining,
            created_at: self.created_at,
        }
    }
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            display_name: db.display_name,
            role: db.role,
            free_trials_remaining: db.free_trials_remaining,
            created_at: db.created_at,
        }
    }
}
