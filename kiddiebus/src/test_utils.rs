//! Shared fixtures for tests.

use std::path::Path;

use crate::api::models::notifications::{DeliveryMethod, NotificationPriority, NotificationType};
use crate::api::models::users::Role;
use crate::db::models::buses::BusCreateDBRequest;
use crate::db::models::notifications::NotificationContent;
use crate::db::models::routes::RouteCreateDBRequest;
use crate::db::models::schools::SchoolCreateDBRequest;
use crate::db::models::students::StudentCreateDBRequest;
use crate::db::models::users::UserCreateDBRequest;
use crate::types::{BusId, RouteId, UserId};
use crate::api::models::buses::BusStatus;
use crate::api::models::routes::RouteStatus;
use crate::api::models::students::StudentCreate;

pub fn user_create(email: &str, role: Role) -> UserCreateDBRequest {
    UserCreateDBRequest {
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        phone: Some("876-555-0000".to_string()),
        role,
    }
}

pub fn bus_create(registration_number: &str) -> BusCreateDBRequest {
    BusCreateDBRequest {
        registration_number: registration_number.to_string(),
        capacity: 30,
        make: Some("Toyota".to_string()),
        model: Some("Coaster".to_string()),
        year: Some(2020),
        status: BusStatus::Active,
    }
}

pub fn route_create(name: &str, operator_id: UserId, bus_id: Option<BusId>) -> RouteCreateDBRequest {
    RouteCreateDBRequest {
        name: name.to_string(),
        description: None,
        bus_id,
        operator_id,
        start_location: None,
        end_location: None,
        start_latitude: None,
        start_longitude: None,
        end_latitude: None,
        end_longitude: None,
        scheduled_start_time: None,
        scheduled_end_time: None,
        days_of_week: Some("Mon,Tue,Wed,Thu,Fri".to_string()),
        status: RouteStatus::Active,
        is_morning_route: true,
    }
}

pub fn school_create(name: &str, operator_id: UserId) -> SchoolCreateDBRequest {
    SchoolCreateDBRequest::new(
        operator_id,
        crate::api::models::schools::SchoolCreate {
            name: name.to_string(),
            address: None,
            city: None,
            parish: None,
            phone: None,
            email: None,
        },
    )
}

pub fn student_create(parent_id: UserId, route_id: Option<RouteId>) -> StudentCreateDBRequest {
    StudentCreateDBRequest::new(
        parent_id,
        StudentCreate {
            first_name: "Kayla".to_string(),
            last_name: "Brown".to_string(),
            date_of_birth: None,
            grade: Some("4".to_string()),
            school_name: None,
            school_id: None,
            parent_id: Some(parent_id),
            route_id,
            pickup_address: None,
            pickup_coordinates: None,
            dropoff_address: None,
            dropoff_coordinates: None,
        },
    )
}

/// Config with the file email transport pointed at a test directory.
pub fn create_test_config(emails_dir: &Path) -> crate::config::Config {
    let mut config = crate::config::Config::default();
    config.email.transport = crate::config::EmailTransportConfig::File {
        path: emails_dir.to_string_lossy().into_owned(),
    };
    config
}

/// State with default config and a dropped delivery queue. Tests that assert
/// on delivery behavior start a real worker instead.
pub fn create_test_state(pool: sqlx::PgPool) -> crate::AppState {
    let mut config = crate::config::Config::default();
    // The Prometheus layer registers a process-global recorder, which can only
    // happen once; tests build many routers in one process, so keep it off.
    config.enable_metrics = false;
    let reporting_offset = config.reporting_offset().unwrap();
    crate::AppState::builder()
        .db(pool)
        .config(config)
        .reporting_offset(reporting_offset)
        .delivery(crate::delivery::DeliveryQueue::noop())
        .build()
}

/// Full router wrapped in a test server. Authenticate requests by adding the
/// `x-kiddiebus-user` header with a seeded user's email.
pub async fn create_test_app(pool: sqlx::PgPool) -> axum_test::TestServer {
    let state = create_test_state(pool);
    axum_test::TestServer::new(crate::build_router(&state)).expect("Failed to create test server")
}

pub fn notification_content(title: &str) -> NotificationContent {
    NotificationContent {
        title: title.to_string(),
        message: format!("{title} message body"),
        notification_type: NotificationType::General,
        priority: NotificationPriority::Normal,
        delivery_method: DeliveryMethod::InApp,
        related_route_id: None,
        related_student_id: None,
    }
}
