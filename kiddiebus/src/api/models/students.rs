//! API request/response models for students.

use crate::api::models::boardings::{BoardingType, VerificationMethod};
use crate::api::models::routes::Coordinates;
use crate::db::models::students::StudentDBResponse;
use crate::types::{BusId, RouteId, SchoolId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentCreate {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub school_id: Option<SchoolId>,
    /// Required for staff callers; parents always register their own children
    #[schema(value_type = Option<String>, format = "uuid")]
    pub parent_id: Option<UserId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub route_id: Option<RouteId>,
    pub pickup_address: Option<String>,
    pub pickup_coordinates: Option<Coordinates>,
    pub dropoff_address: Option<String>,
    pub dropoff_coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub school_id: Option<SchoolId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub route_id: Option<RouteId>,
    pub pickup_address: Option<String>,
    pub pickup_coordinates: Option<Coordinates>,
    pub dropoff_address: Option<String>,
    pub dropoff_coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub school_id: Option<SchoolId>,
    #[schema(value_type = String, format = "uuid")]
    pub parent_id: UserId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub route_id: Option<RouteId>,
    /// Check-in card token presented at the bus door
    pub card_id: Option<String>,
    pub pickup_address: Option<String>,
    pub pickup_coordinates: Option<Coordinates>,
    pub dropoff_address: Option<String>,
    pub dropoff_coordinates: Option<Coordinates>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListStudentsQuery {
    /// Restrict to students assigned to this route
    #[schema(value_type = Option<String>, format = "uuid")]
    #[param(value_type = Option<String>, format = "uuid")]
    pub route_id: Option<RouteId>,
}

/// Body for `POST /students/{id}/checkin`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInRequest {
    #[schema(value_type = String, format = "uuid")]
    pub bus_id: BusId,
    pub boarding_type: BoardingType,
    /// Defaults to the student's assigned route when omitted
    #[schema(value_type = Option<String>, format = "uuid")]
    pub route_id: Option<RouteId>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub verification_method: Option<VerificationMethod>,
    pub notes: Option<String>,
}

impl From<StudentDBResponse> for StudentResponse {
    fn from(db: StudentDBResponse) -> Self {
        let full_name = format!("{} {}", db.first_name, db.last_name);
        let pickup_coordinates = match (db.pickup_latitude, db.pickup_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        };
        let dropoff_coordinates = match (db.dropoff_latitude, db.dropoff_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        };
        Self {
            id: db.id,
            first_name: db.first_name,
            last_name: db.last_name,
            full_name,
            date_of_birth: db.date_of_birth,
            grade: db.grade,
            school_name: db.school_name,
            school_id: db.school_id,
            parent_id: db.parent_id,
            route_id: db.route_id,
            card_id: db.card_id,
            pickup_address: db.pickup_address,
            pickup_coordinates,
            dropoff_address: db.dropoff_address,
            dropoff_coordinates,
            is_active: db.is_active,
            created_at: db.created_at,
        }
    }
}
