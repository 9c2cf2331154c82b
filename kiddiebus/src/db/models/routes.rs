//! Database models for routes.

use crate::api::models::routes::{RouteCreate, RouteStatus, RouteUpdate};
use crate::types::{BusId, RouteId, UserId};
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct RouteCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
    pub bus_id: Option<BusId>,
    pub operator_id: UserId,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub scheduled_start_time: Option<NaiveTime>,
    pub scheduled_end_time: Option<NaiveTime>,
    pub days_of_week: Option<String>,
    pub status: RouteStatus,
    pub is_morning_route: bool,
}

impl RouteCreateDBRequest {
    /// `operator_id` defaults to the creating staff member when the API
    /// request leaves it out.
    pub fn new(default_operator: UserId, api: RouteCreate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            bus_id: api.bus_id,
            operator_id: api.operator_id.unwrap_or(default_operator),
            start_location: api.start_location,
            end_location: api.end_location,
            start_latitude: api.start_coordinates.as_ref().map(|c| c.latitude),
            start_longitude: api.start_coordinates.as_ref().map(|c| c.longitude),
            end_latitude: api.end_coordinates.as_ref().map(|c| c.latitude),
            end_longitude: api.end_coordinates.as_ref().map(|c| c.longitude),
            scheduled_start_time: api.scheduled_start_time,
            scheduled_end_time: api.scheduled_end_time,
            days_of_week: api.days_of_week.map(|days| days.join(",")),
            status: api.status.unwrap_or(RouteStatus::Active),
            is_morning_route: api.is_morning_route.unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub bus_id: Option<BusId>,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub scheduled_start_time: Option<NaiveTime>,
    pub scheduled_end_time: Option<NaiveTime>,
    pub days_of_week: Option<String>,
    pub status: Option<RouteStatus>,
    pub is_morning_route: Option<bool>,
}

impl From<RouteUpdate> for RouteUpdateDBRequest {
    fn from(api: RouteUpdate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            bus_id: api.bus_id,
            start_location: api.start_location,
            end_location: api.end_location,
            start_latitude: api.start_coordinates.as_ref().map(|c| c.latitude),
            start_longitude: api.start_coordinates.as_ref().map(|c| c.longitude),
            end_latitude: api.end_coordinates.as_ref().map(|c| c.latitude),
            end_longitude: api.end_coordinates.as_ref().map(|c| c.longitude),
            scheduled_start_time: api.scheduled_start_time,
            scheduled_end_time: api.scheduled_end_time,
            days_of_week: api.days_of_week.map(|days| days.join(",")),
            status: api.status,
            is_morning_route: api.is_morning_route,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RouteDBResponse {
    pub id: RouteId,
    pub name: String,
    pub description: Option<String>,
    pub bus_id: Option<BusId>,
    pub operator_id: UserId,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub scheduled_start_time: Option<NaiveTime>,
    pub scheduled_end_time: Option<NaiveTime>,
    pub days_of_week: Option<String>,
    pub status: RouteStatus,
    pub is_morning_route: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
