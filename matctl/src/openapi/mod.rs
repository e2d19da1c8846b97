//! OpenAPI documentation for the booking API at `/api/v1/*`.

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::api;
use crate::auth::USER_HEADER;
use crate::booking::DenyReason;
use crate::db::models::{
    occurrences::OccurrenceStatus,
    reservations::ReservationStatus,
    subscriptions::{PlanType, SubscriptionStatus},
    users::Role,
};

/// Security scheme for the trusted proxy user header
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "UserHeader".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    USER_HEADER,
                    "User ID injected by the authenticating reverse proxy",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "Booking API server")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::occurrences::list_occurrences,
        api::handlers::occurrences::get_occurrence,
        api::handlers::occurrences::get_waitlist,
        api::handlers::reservations::create_reservation,
        api::handlers::reservations::list_reservations,
        api::handlers::reservations::get_reservation,
        api::handlers::reservations::cancel_reservation,
        api::handlers::subscriptions::list_subscriptions,
        api::handlers::subscriptions::create_subscription,
        api::handlers::users::get_current_user,
    ),
    components(
        schemas(
            api::models::occurrences::OccurrenceResponse,
            api::models::occurrences::WaitlistEntryResponse,
            api::models::reservations::ReservationCreate,
            api::models::reservations::ReservationCancel,
            api::models::reservations::ReservationResponse,
            api::models::subscriptions::SubscriptionCreate,
            api::models::subscriptions::SubscriptionResponse,
            api::models::users::UserResponse,
            DenyReason,
            OccurrenceStatus,
            ReservationStatus,
            PlanType,
            SubscriptionStatus,
            Role,
        )
    ),
    tags(
        (name = "occurrences", description = "Class schedule and capacity"),
        (name = "reservations", description = "Booking and cancellation"),
        (name = "subscriptions", description = "Membership plans"),
        (name = "users", description = "Account profiles"),
    )
)]
pub struct ApiDoc;
