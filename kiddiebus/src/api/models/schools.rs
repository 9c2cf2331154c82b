//! API request/response models for schools.

use crate::db::models::schools::SchoolDBResponse;
use crate::types::{SchoolId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchoolCreate {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub parish: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchoolUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub parish: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchoolResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SchoolId,
    pub name: String,
    pub address: Option<String>,
    pub city: String,
    pub parish: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub operator_id: Option<UserId>,
    pub is_active: bool,
    /// Active students enrolled at this school
    pub student_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<SchoolDBResponse> for SchoolResponse {
    fn from(db: SchoolDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            address: db.address,
            city: db.city,
            parish: db.parish,
            phone: db.phone,
            email: db.email,
            operator_id: db.operator_id,
            is_active: db.is_active,
            student_count: db.student_count,
            created_at: db.created_at,
        }
    }
}
