//! Database models for students.

use crate::api::models::students::{StudentCreate, StudentUpdate};
use crate::types::{RouteId, SchoolId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StudentCreateDBRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    pub school_id: Option<SchoolId>,
    pub parent_id: UserId,
    pub route_id: Option<RouteId>,
    pub card_id: String,
    pub pickup_address: Option<String>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_address: Option<String>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
}

impl StudentCreateDBRequest {
    pub fn new(parent_id: UserId, api: StudentCreate) -> Self {
        Self {
            first_name: api.first_name,
            last_name: api.last_name,
            date_of_birth: api.date_of_birth,
            grade: api.grade,
            school_name: api.school_name,
            school_id: api.school_id,
            parent_id,
            route_id: api.route_id,
            card_id: generate_card_id(),
            pickup_address: api.pickup_address,
            pickup_latitude: api.pickup_coordinates.as_ref().map(|c| c.latitude),
            pickup_longitude: api.pickup_coordinates.as_ref().map(|c| c.longitude),
            dropoff_address: api.dropoff_address,
            dropoff_latitude: api.dropoff_coordinates.as_ref().map(|c| c.latitude),
            dropoff_longitude: api.dropoff_coordinates.as_ref().map(|c| c.longitude),
        }
    }
}

/// Short uppercase token printed on the physical check-in card.
fn generate_card_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

#[derive(Debug, Clone, Default)]
pub struct StudentUpdateDBRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    pub school_id: Option<SchoolId>,
    pub route_id: Option<RouteId>,
    pub pickup_address: Option<String>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_address: Option<String>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
}

impl From<StudentUpdate> for StudentUpdateDBRequest {
    fn from(api: StudentUpdate) -> Self {
        Self {
            first_name: api.first_name,
            last_name: api.last_name,
            date_of_birth: api.date_of_birth,
            grade: api.grade,
            school_name: api.school_name,
            school_id: api.school_id,
            route_id: api.route_id,
            pickup_address: api.pickup_address,
            pickup_latitude: api.pickup_coordinates.as_ref().map(|c| c.latitude),
            pickup_longitude: api.pickup_coordinates.as_ref().map(|c| c.longitude),
            dropoff_address: api.dropoff_address,
            dropoff_latitude: api.dropoff_coordinates.as_ref().map(|c| c.latitude),
            dropoff_longitude: api.dropoff_coordinates.as_ref().map(|c| c.longitude),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StudentDBResponse {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    pub school_id: Option<SchoolId>,
    pub parent_id: UserId,
    pub route_id: Option<RouteId>,
    pub card_id: Option<String>,
    pub pickup_address: Option<String>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_address: Option<String>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_ids_are_short_uppercase_tokens() {
        let card = generate_card_id();
        assert_eq!(card.len(), 8);
        assert!(card.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn card_ids_are_unique_enough() {
        let a = generate_card_id();
        let b = generate_card_id();
        assert_ne!(a, b);
    }
}
