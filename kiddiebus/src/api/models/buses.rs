//! API request/response models for buses.

use crate::db::models::buses::BusDBResponse;
use crate::types::BusId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "bus_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    Active,
    Maintenance,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BusCreate {
    pub registration_number: String,
    pub capacity: i32,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub status: Option<BusStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BusUpdate {
    pub registration_number: Option<String>,
    pub capacity: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub status: Option<BusStatus>,
}

/// Latest reported position. Stored verbatim; no track analytics.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BusLocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BusLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BusResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: BusId,
    pub registration_number: String,
    pub capacity: i32,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub status: BusStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<BusLocation>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListBusesQuery {
    pub status: Option<BusStatus>,
}

impl From<BusDBResponse> for BusResponse {
    fn from(db: BusDBResponse) -> Self {
        let current_location = match (db.current_latitude, db.current_longitude) {
            (Some(latitude), Some(longitude)) => Some(BusLocation {
                latitude,
                longitude,
                updated_at: db.last_location_update,
            }),
            _ => None,
        };
        Self {
            id: db.id,
            registration_number: db.registration_number,
            capacity: db.capacity,
            make: db.make,
            model: db.model,
            year: db.year,
            status: db.status,
            current_location,
            created_at: db.created_at,
        }
    }
}
