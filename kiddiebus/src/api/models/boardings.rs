//! API response models for boarding events.
//!
//! Boardings are created through `POST /students/{id}/checkin` (see
//! [`crate::api::models::students::CheckInRequest`]) and are append-only:
//! there is no update or delete surface.

use crate::api::models::routes::Coordinates;
use crate::api::models::students::StudentResponse;
use crate::db::models::boardings::BoardingDBResponse;
use crate::types::{BoardingId, BusId, RouteId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Direction of a boarding event. Pickup and dropoff are independent daily
/// counters: a dropoff does not require a prior pickup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "boarding_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BoardingType {
    Pickup,
    Dropoff,
}

impl std::fmt::Display for BoardingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardingType::Pickup => write!(f, "pickup"),
            BoardingType::Dropoff => write!(f, "dropoff"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "verification_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    Card,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BoardingResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: BoardingId,
    #[schema(value_type = String, format = "uuid")]
    pub student_id: StudentId,
    /// Denormalized student summary for device display
    pub student: Option<StudentResponse>,
    #[schema(value_type = String, format = "uuid")]
    pub bus_id: BusId,
    #[schema(value_type = String, format = "uuid")]
    pub route_id: RouteId,
    pub boarding_type: BoardingType,
    pub boarding_time: DateTime<Utc>,
    pub boarding_day: NaiveDate,
    pub location: Option<Coordinates>,
    #[schema(value_type = String, format = "uuid")]
    pub verified_by_id: UserId,
    pub verification_method: VerificationMethod,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<BoardingDBResponse> for BoardingResponse {
    fn from(db: BoardingDBResponse) -> Self {
        let location = match (db.latitude, db.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        };
        Self {
            id: db.id,
            student_id: db.student_id,
            student: None,
            bus_id: db.bus_id,
            route_id: db.route_id,
            boarding_type: db.boarding_type,
            boarding_time: db.boarding_time,
            boarding_day: db.boarding_day,
            location,
            verified_by_id: db.verified_by_id,
            verification_method: db.verification_method,
            notes: db.notes,
            created_at: db.created_at,
        }
    }
}

impl BoardingResponse {
    pub fn with_student(mut self, student: StudentResponse) -> Self {
        self.student = Some(student);
        self
    }
}
