//! OpenAPI documentation for the management API at `/api/v1/*`.
//!
//! The interactive reference is served at `/docs` via Scalar.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Security scheme addon: the trusted identity header set by the
/// authenticating proxy in front of this service.
struct IdentityHeaderAddon;

impl Modify for IdentityHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "IdentityHeader".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-kiddiebus-user",
                    "Email of the authenticated user, set by the identity-aware proxy. \
                     The proxy verifies credentials and strips this header from client requests.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "Management API")
    ),
    modifiers(&IdentityHeaderAddon),
    paths(
        // Users and self-service profile
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::users::get_me,
        api::handlers::users::update_me,
        // Fleet
        api::handlers::buses::list_buses,
        api::handlers::buses::create_bus,
        api::handlers::buses::get_bus,
        api::handlers::buses::update_bus,
        api::handlers::buses::update_bus_location,
        api::handlers::buses::delete_bus,
        // Routes
        api::handlers::routes::list_routes,
        api::handlers::routes::create_route,
        api::handlers::routes::get_route,
        api::handlers::routes::update_route,
        api::handlers::routes::delete_route,
        api::handlers::routes::route_students,
        // Schools
        api::handlers::schools::list_schools,
        api::handlers::schools::list_all_schools,
        api::handlers::schools::create_school,
        api::handlers::schools::get_school,
        api::handlers::schools::update_school,
        api::handlers::schools::delete_school,
        api::handlers::schools::school_students,
        // Students and check-in
        api::handlers::students::list_students,
        api::handlers::students::create_student,
        api::handlers::students::get_student,
        api::handlers::students::update_student,
        api::handlers::students::delete_student,
        api::handlers::students::get_student_by_card,
        api::handlers::students::student_boardings,
        api::handlers::students::checkin,
        // Notifications
        api::handlers::notifications::list_notifications,
        api::handlers::notifications::get_notification,
        api::handlers::notifications::send_notification,
        api::handlers::notifications::broadcast_notification,
        api::handlers::notifications::mark_read,
        api::handlers::notifications::mark_all_read,
        api::handlers::notifications::delete_notification,
    ),
    components(
        schemas(
            api::models::users::Role,
            api::models::users::UserResponse,
            api::models::users::UserUpdate,
            api::models::users::ProfileUpdate,
            api::models::buses::BusStatus,
            api::models::buses::BusCreate,
            api::models::buses::BusUpdate,
            api::models::buses::BusLocationUpdate,
            api::models::buses::BusLocation,
            api::models::buses::BusResponse,
            api::models::routes::RouteStatus,
            api::models::routes::Coordinates,
            api::models::routes::RouteCreate,
            api::models::routes::RouteUpdate,
            api::models::routes::RouteResponse,
            api::models::schools::SchoolCreate,
            api::models::schools::SchoolUpdate,
            api::models::schools::SchoolResponse,
            api::models::students::StudentCreate,
            api::models::students::StudentUpdate,
            api::models::students::StudentResponse,
            api::models::students::CheckInRequest,
            api::models::boardings::BoardingType,
            api::models::boardings::VerificationMethod,
            api::models::boardings::BoardingResponse,
            api::models::notifications::NotificationType,
            api::models::notifications::NotificationPriority,
            api::models::notifications::DeliveryMethod,
            api::models::notifications::NotificationSend,
            api::models::notifications::BroadcastRequest,
            api::models::notifications::NotificationResponse,
            api::models::notifications::NotificationListResponse,
            api::models::notifications::DispatchResponse,
            api::models::notifications::MarkAllReadResponse,
        )
    ),
    tags(
        (name = "users", description = "User accounts and the self-service profile"),
        (name = "buses", description = "Fleet registry and live bus locations"),
        (name = "routes", description = "Bus routes and their rosters"),
        (name = "schools", description = "Schools served by the fleet"),
        (name = "students", description = "Student registry and the boarding check-in flow"),
        (name = "notifications", description = "Inbox, direct sends, and broadcasts"),
    ),
    info(
        title = "Kiddie Bus API",
        description = "School-bus transportation tracker: boarding events, parent notifications, and route management."
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builds_and_covers_checkin() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();
        assert!(json.contains("/students/{student_id}/checkin"));
        assert!(json.contains("IdentityHeader"));
    }
}
