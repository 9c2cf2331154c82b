//! Database repository for buses.

use std::collections::HashMap;

use crate::types::{BusId, abbrev_uuid};
use crate::{
    api::models::buses::BusStatus,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::buses::{BusCreateDBRequest, BusDBResponse, BusUpdateDBRequest},
    },
};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing buses
#[derive(Debug, Clone, Default)]
pub struct BusFilter {
    pub status: Option<BusStatus>,
}

pub struct Buses<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Buses<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Overwrite the latest reported position. Positions are not tracked
    /// historically.
    #[instrument(skip(self), fields(bus_id = %abbrev_uuid(&id)), err)]
    pub async fn update_location(&mut self, id: BusId, latitude: f64, longitude: f64) -> Result<BusDBResponse> {
        let bus = sqlx::query_as::<_, BusDBResponse>(
            r#"
            UPDATE buses SET
                current_latitude = $2,
                current_longitude = $3,
                last_location_update = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(latitude)
        .bind(longitude)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(bus)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Buses<'c> {
    type CreateRequest = BusCreateDBRequest;
    type UpdateRequest = BusUpdateDBRequest;
    type Response = BusDBResponse;
    type Id = BusId;
    type Filter = BusFilter;

    #[instrument(skip(self, request), fields(registration = %request.registration_number), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let bus = sqlx::query_as::<_, BusDBResponse>(
            r#"
            INSERT INTO buses (registration_number, capacity, make, model, year, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&request.registration_number)
        .bind(request.capacity)
        .bind(&request.make)
        .bind(&request.model)
        .bind(request.year)
        .bind(request.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(bus)
    }

    #[instrument(skip(self), fields(bus_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let bus = sqlx::query_as::<_, BusDBResponse>("SELECT * FROM buses WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(bus)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<BusId>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let buses = sqlx::query_as::<_, BusDBResponse>("SELECT * FROM buses WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(buses.into_iter().map(|b| (b.id, b)).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let buses = sqlx::query_as::<_, BusDBResponse>(
            "SELECT * FROM buses WHERE ($1::bus_status IS NULL OR status = $1) ORDER BY registration_number",
        )
        .bind(filter.status)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(buses)
    }

    #[instrument(skip(self), fields(bus_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Buses are retired, not removed: boardings reference them.
        let result = sqlx::query("UPDATE buses SET status = 'inactive', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(bus_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let bus = sqlx::query_as::<_, BusDBResponse>(
            r#"
            UPDATE buses SET
                registration_number = COALESCE($2, registration_number),
                capacity = COALESCE($3, capacity),
                make = COALESCE($4, make),
                model = COALESCE($5, model),
                year = COALESCE($6, year),
                status = COALESCE($7, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.registration_number)
        .bind(request.capacity)
        .bind(&request.make)
        .bind(&request.model)
        .bind(request.year)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_bus(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Buses::new(&mut conn);

        let bus = repo.create(&test_utils::bus_create("PP-1234")).await.unwrap();
        assert_eq!(bus.registration_number, "PP-1234");
        assert_eq!(bus.status, BusStatus::Active);
        assert!(bus.current_latitude.is_none());

        let fetched = repo.get_by_id(bus.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, bus.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_registration_is_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Buses::new(&mut conn);

        repo.create(&test_utils::bus_create("PP-1234")).await.unwrap();
        let err = repo.create(&test_utils::bus_create("PP-1234")).await.unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_location(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Buses::new(&mut conn);

        let bus = repo.create(&test_utils::bus_create("PP-5678")).await.unwrap();
        let updated = repo.update_location(bus.id, 18.041, -77.507).await.unwrap();

        assert_eq!(updated.current_latitude, Some(18.041));
        assert_eq!(updated.current_longitude, Some(-77.507));
        assert!(updated.last_location_update.is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_by_status(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Buses::new(&mut conn);

        let bus = repo.create(&test_utils::bus_create("PP-0001")).await.unwrap();
        repo.create(&test_utils::bus_create("PP-0002")).await.unwrap();

        repo.update(
            bus.id,
            &BusUpdateDBRequest {
                registration_number: None,
                capacity: None,
                make: None,
                model: None,
                year: None,
                status: Some(BusStatus::Maintenance),
            },
        )
        .await
        .unwrap();

        let active = repo
            .list(&BusFilter {
                status: Some(BusStatus::Active),
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].registration_number, "PP-0002");
    }
}
