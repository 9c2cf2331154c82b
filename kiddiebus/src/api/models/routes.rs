//! API request/response models for routes.

use crate::db::models::routes::RouteDBResponse;
use crate::types::{BusId, RouteId, UserId};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "route_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Active,
    Inactive,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteCreate {
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub bus_id: Option<BusId>,
    /// Defaults to the creating operator when omitted
    #[schema(value_type = Option<String>, format = "uuid")]
    pub operator_id: Option<UserId>,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub start_coordinates: Option<Coordinates>,
    pub end_coordinates: Option<Coordinates>,
    pub scheduled_start_time: Option<NaiveTime>,
    pub scheduled_end_time: Option<NaiveTime>,
    pub days_of_week: Option<Vec<String>>,
    pub status: Option<RouteStatus>,
    pub is_morning_route: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub bus_id: Option<BusId>,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub start_coordinates: Option<Coordinates>,
    pub end_coordinates: Option<Coordinates>,
    pub scheduled_start_time: Option<NaiveTime>,
    pub scheduled_end_time: Option<NaiveTime>,
    pub days_of_week: Option<Vec<String>>,
    pub status: Option<RouteStatus>,
    pub is_morning_route: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RouteId,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub bus_id: Option<BusId>,
    #[schema(value_type = String, format = "uuid")]
    pub operator_id: UserId,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub start_coordinates: Option<Coordinates>,
    pub end_coordinates: Option<Coordinates>,
    pub scheduled_start_time: Option<NaiveTime>,
    pub scheduled_end_time: Option<NaiveTime>,
    pub days_of_week: Vec<String>,
    pub status: RouteStatus,
    pub is_morning_route: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListRoutesQuery {
    pub status: Option<RouteStatus>,
    /// Restrict to routes owned by this operator
    #[schema(value_type = Option<String>, format = "uuid")]
    #[param(value_type = Option<String>, format = "uuid")]
    pub operator_id: Option<UserId>,
}

impl From<RouteDBResponse> for RouteResponse {
    fn from(db: RouteDBResponse) -> Self {
        let start_coordinates = match (db.start_latitude, db.start_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        };
        let end_coordinates = match (db.end_latitude, db.end_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        };
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            bus_id: db.bus_id,
            operator_id: db.operator_id,
            start_location: db.start_location,
            end_location: db.end_location,
            start_coordinates,
            end_coordinates,
            scheduled_start_time: db.scheduled_start_time,
            scheduled_end_time: db.scheduled_end_time,
            days_of_week: db
                .days_of_week
                .map(|s| s.split(',').filter(|d| !d.is_empty()).map(|d| d.trim().to_string()).collect())
                .unwrap_or_default(),
            status: db.status,
            is_morning_route: db.is_morning_route,
            created_at: db.created_at,
        }
    }
}
