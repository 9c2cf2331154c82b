//! Database repository for boarding events.
//!
//! Boardings are append-only: there is no update or delete path. The
//! one-pickup-one-dropoff-per-day rule is enforced by the
//! `boardings_student_day_type_key` unique index, so concurrent submissions
//! for the same student, day, and type race on the index and exactly one
//! insert wins. Callers detect the loser via
//! [`DbError::is_duplicate_boarding`](crate::db::errors::DbError::is_duplicate_boarding).

use crate::types::{BoardingId, RouteId, StudentId, abbrev_uuid};
use crate::db::{
    errors::Result,
    models::boardings::{BoardingDBResponse, BoardingRecordDBRequest},
};
use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing a student's boarding history
#[derive(Debug, Clone)]
pub struct BoardingFilter {
    pub limit: i64,
}

impl Default for BoardingFilter {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

pub struct Boardings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Boardings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a boarding event. A `UniqueViolation` on the daily index means
    /// the student already has an event of this type today.
    #[instrument(
        skip(self, request),
        fields(
            student_id = %abbrev_uuid(&request.student_id),
            boarding_type = %request.boarding_type,
            day = %request.boarding_day,
        ),
        err
    )]
    pub async fn record(&mut self, request: &BoardingRecordDBRequest) -> Result<BoardingDBResponse> {
        let boarding = sqlx::query_as::<_, BoardingDBResponse>(
            r#"
            INSERT INTO boardings (
                student_id, bus_id, route_id, boarding_type,
                boarding_time, boarding_day, latitude, longitude,
                verified_by_id, verification_method, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(request.student_id)
        .bind(request.bus_id)
        .bind(request.route_id)
        .bind(request.boarding_type)
        .bind(request.boarding_time)
        .bind(request.boarding_day)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(request.verified_by_id)
        .bind(request.verification_method)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(boarding)
    }

    #[instrument(skip(self), fields(boarding_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: BoardingId) -> Result<Option<BoardingDBResponse>> {
        let boarding = sqlx::query_as::<_, BoardingDBResponse>("SELECT * FROM boardings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(boarding)
    }

    /// A student's boarding history, most recent first.
    #[instrument(skip(self, filter), fields(student_id = %abbrev_uuid(&student_id)), err)]
    pub async fn list_for_student(
        &mut self,
        student_id: StudentId,
        filter: &BoardingFilter,
    ) -> Result<Vec<BoardingDBResponse>> {
        let boardings = sqlx::query_as::<_, BoardingDBResponse>(
            "SELECT * FROM boardings WHERE student_id = $1 ORDER BY boarding_time DESC LIMIT $2",
        )
        .bind(student_id)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(boardings)
    }

    /// Everything recorded on a route for one reporting day. Backs the
    /// operator's end-of-run review.
    #[instrument(skip(self), fields(route_id = %abbrev_uuid(&route_id), day = %day), err)]
    pub async fn list_for_route_on_day(&mut self, route_id: RouteId, day: NaiveDate) -> Result<Vec<BoardingDBResponse>> {
        let boardings = sqlx::query_as::<_, BoardingDBResponse>(
            "SELECT * FROM boardings WHERE route_id = $1 AND boarding_day = $2 ORDER BY boarding_time",
        )
        .bind(route_id)
        .bind(day)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(boardings)
    }
}
