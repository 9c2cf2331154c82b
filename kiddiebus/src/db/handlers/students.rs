//! Database repository for students.

use std::collections::HashMap;

use crate::types::{RouteId, SchoolId, StudentId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::students::{StudentCreateDBRequest, StudentDBResponse, StudentUpdateDBRequest},
};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing students. Parents see their own children only, so the
/// API layer sets `parent_id` for them.
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub parent_id: Option<UserId>,
    pub route_id: Option<RouteId>,
    pub school_id: Option<SchoolId>,
}

pub struct Students<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Students<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Resolve a card tap to the active student carrying that card.
    #[instrument(skip(self, card_id), err)]
    pub async fn get_by_card(&mut self, card_id: &str) -> Result<Option<StudentDBResponse>> {
        let student =
            sqlx::query_as::<_, StudentDBResponse>("SELECT * FROM students WHERE card_id = $1 AND is_active")
                .bind(card_id)
                .fetch_optional(&mut *self.db)
                .await?;
        Ok(student)
    }

    /// All active students assigned to a route. Used by the checkin handler
    /// and the roster endpoint.
    #[instrument(skip(self), fields(route_id = %abbrev_uuid(&route_id)), err)]
    pub async fn list_on_route(&mut self, route_id: RouteId) -> Result<Vec<StudentDBResponse>> {
        let students = sqlx::query_as::<_, StudentDBResponse>(
            "SELECT * FROM students WHERE route_id = $1 AND is_active ORDER BY last_name, first_name",
        )
        .bind(route_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(students)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Students<'c> {
    type CreateRequest = StudentCreateDBRequest;
    type UpdateRequest = StudentUpdateDBRequest;
    type Response = StudentDBResponse;
    type Id = StudentId;
    type Filter = StudentFilter;

    #[instrument(skip(self, request), fields(parent_id = %abbrev_uuid(&request.parent_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let student = sqlx::query_as::<_, StudentDBResponse>(
            r#"
            INSERT INTO students (
                first_name, last_name, date_of_birth, grade,
                school_name, school_id, parent_id, route_id, card_id,
                pickup_address, pickup_latitude, pickup_longitude,
                dropoff_address, dropoff_latitude, dropoff_longitude
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.date_of_birth)
        .bind(&request.grade)
        .bind(&request.school_name)
        .bind(request.school_id)
        .bind(request.parent_id)
        .bind(request.route_id)
        .bind(&request.card_id)
        .bind(&request.pickup_address)
        .bind(request.pickup_latitude)
        .bind(request.pickup_longitude)
        .bind(&request.dropoff_address)
        .bind(request.dropoff_latitude)
        .bind(request.dropoff_longitude)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(student)
    }

    #[instrument(skip(self), fields(student_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let student = sqlx::query_as::<_, StudentDBResponse>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(student)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<StudentId>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let students = sqlx::query_as::<_, StudentDBResponse>("SELECT * FROM students WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(students.into_iter().map(|s| (s.id, s)).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let students = sqlx::query_as::<_, StudentDBResponse>(
            r#"
            SELECT * FROM students
            WHERE is_active
              AND ($1::uuid IS NULL OR parent_id = $1)
              AND ($2::uuid IS NULL OR route_id = $2)
              AND ($3::uuid IS NULL OR school_id = $3)
            ORDER BY last_name, first_name
            "#,
        )
        .bind(filter.parent_id)
        .bind(filter.route_id)
        .bind(filter.school_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(students)
    }

    #[instrument(skip(self), fields(student_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Soft delete: boarding history must survive the student's removal.
        let result = sqlx::query("UPDATE students SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(student_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let student = sqlx::query_as::<_, StudentDBResponse>(
            r#"
            UPDATE students SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                date_of_birth = COALESCE($4, date_of_birth),
                grade = COALESCE($5, grade),
                school_name = COALESCE($6, school_name),
                school_id = COALESCE($7, school_id),
                route_id = COALESCE($8, route_id),
                pickup_address = COALESCE($9, pickup_address),
                pickup_latitude = COALESCE($10, pickup_latitude),
                pickup_longitude = COALESCE($11, pickup_longitude),
                dropoff_address = COALESCE($12, dropoff_address),
                dropoff_latitude = COALESCE($13, dropoff_latitude),
                dropoff_longitude = COALESCE($14, dropoff_longitude),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.date_of_birth)
        .bind(&request.grade)
        .bind(&request.school_name)
        .bind(request.school_id)
        .bind(request.route_id)
        .bind(&request.pickup_address)
        .bind(request.pickup_latitude)
        .bind(request.pickup_longitude)
        .bind(&request.dropoff_address)
        .bind(request.dropoff_latitude)
        .bind(request.dropoff_longitude)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(student)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::handlers::{Routes, Users};
    use crate::test_utils;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_assigns_card(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let parent = Users::new(&mut conn)
            .create(&test_utils::user_create("parent@example.com", Role::Parent))
            .await
            .unwrap();

        let mut repo = Students::new(&mut conn);
        let student = repo.create(&test_utils::student_create(parent.id, None)).await.unwrap();

        let card = student.card_id.expect("student should get a card on creation");
        assert_eq!(card.len(), 8);

        let by_card = repo.get_by_card(&card).await.unwrap().unwrap();
        assert_eq!(by_card.id, student.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_by_card_ignores_inactive(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let parent = Users::new(&mut conn)
            .create(&test_utils::user_create("parent@example.com", Role::Parent))
            .await
            .unwrap();

        let mut repo = Students::new(&mut conn);
        let student = repo.create(&test_utils::student_create(parent.id, None)).await.unwrap();
        let card = student.card_id.clone().unwrap();

        repo.delete(student.id).await.unwrap();

        assert!(repo.get_by_card(&card).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_scoped_to_parent(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut users = Users::new(&mut conn);
        let parent_a = users
            .create(&test_utils::user_create("a@example.com", Role::Parent))
            .await
            .unwrap();
        let parent_b = users
            .create(&test_utils::user_create("b@example.com", Role::Parent))
            .await
            .unwrap();

        let mut repo = Students::new(&mut conn);
        repo.create(&test_utils::student_create(parent_a.id, None)).await.unwrap();
        repo.create(&test_utils::student_create(parent_a.id, None)).await.unwrap();
        repo.create(&test_utils::student_create(parent_b.id, None)).await.unwrap();

        let mine = repo
            .list(&StudentFilter {
                parent_id: Some(parent_a.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|s| s.parent_id == parent_a.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_on_route(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut users = Users::new(&mut conn);
        let operator = users
            .create(&test_utils::user_create("op@example.com", Role::Operator))
            .await
            .unwrap();
        let parent = users
            .create(&test_utils::user_create("parent@example.com", Role::Parent))
            .await
            .unwrap();

        let route = Routes::new(&mut conn)
            .create(&test_utils::route_create("North", operator.id, None))
            .await
            .unwrap();

        let mut repo = Students::new(&mut conn);
        let on_route = repo
            .create(&test_utils::student_create(parent.id, Some(route.id)))
            .await
            .unwrap();
        repo.create(&test_utils::student_create(parent.id, None)).await.unwrap();

        let roster = repo.list_on_route(route.id).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].id, on_route.id);
    }
}
