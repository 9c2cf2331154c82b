//! Database models for buses.

use crate::api::models::buses::{BusCreate, BusStatus, BusUpdate};
use crate::types::BusId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct BusCreateDBRequest {
    pub registration_number: String,
    pub capacity: i32,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub status: BusStatus,
}

impl From<BusCreate> for BusCreateDBRequest {
    fn from(api: BusCreate) -> Self {
        Self {
            registration_number: api.registration_number,
            capacity: api.capacity,
            make: api.make,
            model: api.model,
            year: api.year,
            status: api.status.unwrap_or(BusStatus::Active),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BusUpdateDBRequest {
    pub registration_number: Option<String>,
    pub capacity: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub status: Option<BusStatus>,
}

impl From<BusUpdate> for BusUpdateDBRequest {
    fn from(api: BusUpdate) -> Self {
        Self {
            registration_number: api.registration_number,
            capacity: api.capacity,
            make: api.make,
            model: api.model,
            year: api.year,
            status: api.status,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BusDBResponse {
    pub id: BusId,
    pub registration_number: String,
    pub capacity: i32,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub status: BusStatus,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub last_location_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
