//! Database models for boarding events.

use crate::api::models::boardings::{BoardingType, VerificationMethod};
use crate::types::{BoardingId, BusId, RouteId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Database request for recording a boarding event.
///
/// `boarding_time` is the server-assigned event timestamp and `boarding_day`
/// its calendar day in the configured reporting timezone; both are computed
/// by the caller from the same instant so the daily-uniqueness index sees a
/// consistent pair.
#[derive(Debug, Clone)]
pub struct BoardingRecordDBRequest {
    pub student_id: StudentId,
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub boarding_type: BoardingType,
    pub boarding_time: DateTime<Utc>,
    pub boarding_day: NaiveDate,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub verified_by_id: UserId,
    pub verification_method: VerificationMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BoardingDBResponse {
    pub id: BoardingId,
    pub student_id: StudentId,
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub boarding_type: BoardingType,
    pub boarding_time: DateTime<Utc>,
    pub boarding_day: NaiveDate,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub verified_by_id: UserId,
    pub verification_method: VerificationMethod,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
