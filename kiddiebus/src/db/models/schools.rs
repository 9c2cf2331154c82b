//! Database models for schools.

use crate::api::models::schools::{SchoolCreate, SchoolUpdate};
use crate::types::{SchoolId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct SchoolCreateDBRequest {
    pub name: String,
    pub address: Option<String>,
    pub city: String,
    pub parish: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub operator_id: Option<UserId>,
}

impl SchoolCreateDBRequest {
    pub fn new(operator_id: UserId, api: SchoolCreate) -> Self {
        Self {
            name: api.name,
            address: api.address,
            city: api.city.unwrap_or_else(|| "Mandeville".to_string()),
            parish: api.parish.unwrap_or_else(|| "Manchester".to_string()),
            phone: api.phone,
            email: api.email,
            operator_id: Some(operator_id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchoolUpdateDBRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub parish: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl From<SchoolUpdate> for SchoolUpdateDBRequest {
    fn from(api: SchoolUpdate) -> Self {
        Self {
            name: api.name,
            address: api.address,
            city: api.city,
            parish: api.parish,
            phone: api.phone,
            email: api.email,
        }
    }
}

/// School row plus its active-student count (computed in the SELECT).
#[derive(Debug, Clone, FromRow)]
pub struct SchoolDBResponse {
    pub id: SchoolId,
    pub name: String,
    pub address: Option<String>,
    pub city: String,
    pub parish: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub operator_id: Option<UserId>,
    pub is_active: bool,
    pub student_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
