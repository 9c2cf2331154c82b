//! Database repository for routes.

use std::collections::HashMap;

use crate::types::{RouteId, UserId, abbrev_uuid};
use crate::{
    api::models::routes::RouteStatus,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::routes::{RouteCreateDBRequest, RouteDBResponse, RouteUpdateDBRequest},
    },
};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing routes. Operators list only their own routes, so the
/// API layer sets `operator_id` for them.
#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    pub status: Option<RouteStatus>,
    pub operator_id: Option<UserId>,
}

pub struct Routes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Routes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Routes<'c> {
    type CreateRequest = RouteCreateDBRequest;
    type UpdateRequest = RouteUpdateDBRequest;
    type Response = RouteDBResponse;
    type Id = RouteId;
    type Filter = RouteFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let route = sqlx::query_as::<_, RouteDBResponse>(
            r#"
            INSERT INTO routes (
                name, description, bus_id, operator_id,
                start_location, end_location,
                start_latitude, start_longitude, end_latitude, end_longitude,
                scheduled_start_time, scheduled_end_time,
                days_of_week, status, is_morning_route
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.bus_id)
        .bind(request.operator_id)
        .bind(&request.start_location)
        .bind(&request.end_location)
        .bind(request.start_latitude)
        .bind(request.start_longitude)
        .bind(request.end_latitude)
        .bind(request.end_longitude)
        .bind(request.scheduled_start_time)
        .bind(request.scheduled_end_time)
        .bind(&request.days_of_week)
        .bind(request.status)
        .bind(request.is_morning_route)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(route)
    }

    #[instrument(skip(self), fields(route_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let route = sqlx::query_as::<_, RouteDBResponse>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(route)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<RouteId>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let routes = sqlx::query_as::<_, RouteDBResponse>("SELECT * FROM routes WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(routes.into_iter().map(|r| (r.id, r)).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let routes = sqlx::query_as::<_, RouteDBResponse>(
            r#"
            SELECT * FROM routes
            WHERE ($1::route_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR operator_id = $2)
            ORDER BY name
            "#,
        )
        .bind(filter.status)
        .bind(filter.operator_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(routes)
    }

    #[instrument(skip(self), fields(route_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Routes are deactivated, not removed: students and boardings
        // reference them.
        let result = sqlx::query("UPDATE routes SET status = 'inactive', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(route_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let route = sqlx::query_as::<_, RouteDBResponse>(
            r#"
            UPDATE routes SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                bus_id = COALESCE($4, bus_id),
                start_location = COALESCE($5, start_location),
                end_location = COALESCE($6, end_location),
                start_latitude = COALESCE($7, start_latitude),
                start_longitude = COALESCE($8, start_longitude),
                end_latitude = COALESCE($9, end_latitude),
                end_longitude = COALESCE($10, end_longitude),
                scheduled_start_time = COALESCE($11, scheduled_start_time),
                scheduled_end_time = COALESCE($12, scheduled_end_time),
                days_of_week = COALESCE($13, days_of_week),
                status = COALESCE($14, status),
                is_morning_route = COALESCE($15, is_morning_route),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.bus_id)
        .bind(&request.start_location)
        .bind(&request.end_location)
        .bind(request.start_latitude)
        .bind(request.start_longitude)
        .bind(request.end_latitude)
        .bind(request.end_longitude)
        .bind(request.scheduled_start_time)
        .bind(request.scheduled_end_time)
        .bind(&request.days_of_week)
        .bind(request.status)
        .bind(request.is_morning_route)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::handlers::Users;
    use crate::test_utils;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_route_with_defaults(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let operator = Users::new(&mut conn)
            .create(&test_utils::user_create("op@example.com", Role::Operator))
            .await
            .unwrap();

        let mut repo = Routes::new(&mut conn);
        let route = repo
            .create(&test_utils::route_create("Morning North", operator.id, None))
            .await
            .unwrap();

        assert_eq!(route.name, "Morning North");
        assert_eq!(route.operator_id, operator.id);
        assert_eq!(route.status, RouteStatus::Active);
        assert!(route.is_morning_route);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_scoped_to_operator(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let op_a = Users::new(&mut conn)
            .create(&test_utils::user_create("a@example.com", Role::Operator))
            .await
            .unwrap();
        let op_b = Users::new(&mut conn)
            .create(&test_utils::user_create("b@example.com", Role::Operator))
            .await
            .unwrap();

        let mut repo = Routes::new(&mut conn);
        repo.create(&test_utils::route_create("A1", op_a.id, None)).await.unwrap();
        repo.create(&test_utils::route_create("A2", op_a.id, None)).await.unwrap();
        repo.create(&test_utils::route_create("B1", op_b.id, None)).await.unwrap();

        let mine = repo
            .list(&RouteFilter {
                operator_id: Some(op_a.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.operator_id == op_a.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_status(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let operator = Users::new(&mut conn)
            .create(&test_utils::user_create("op@example.com", Role::Operator))
            .await
            .unwrap();

        let mut repo = Routes::new(&mut conn);
        let route = repo
            .create(&test_utils::route_create("Evening South", operator.id, None))
            .await
            .unwrap();

        let updated = repo
            .update(
                route.id,
                &RouteUpdateDBRequest {
                    status: Some(RouteStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, RouteStatus::Completed);
        assert_eq!(updated.name, "Evening South");
    }
}
