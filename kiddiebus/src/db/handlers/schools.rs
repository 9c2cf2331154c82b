//! Database repository for schools.

use std::collections::HashMap;

use crate::types::{SchoolId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::schools::{SchoolCreateDBRequest, SchoolDBResponse, SchoolUpdateDBRequest},
};
use sqlx::PgConnection;
use tracing::instrument;

// Every read joins in the active-student count so the API never needs a
// second round trip.
const SELECT_WITH_COUNT: &str = r#"
    SELECT s.*,
           (SELECT COUNT(*) FROM students st WHERE st.school_id = s.id AND st.is_active) AS student_count
    FROM schools s
"#;

/// Filter for listing schools
#[derive(Debug, Clone, Default)]
pub struct SchoolFilter {
    pub operator_id: Option<UserId>,
}

pub struct Schools<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Schools<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Schools<'c> {
    type CreateRequest = SchoolCreateDBRequest;
    type UpdateRequest = SchoolUpdateDBRequest;
    type Response = SchoolDBResponse;
    type Id = SchoolId;
    type Filter = SchoolFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let school = sqlx::query_as::<_, SchoolDBResponse>(
            r#"
            INSERT INTO schools (name, address, city, parish, phone, email, operator_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *, 0::bigint AS student_count
            "#,
        )
        .bind(&request.name)
        .bind(&request.address)
        .bind(&request.city)
        .bind(&request.parish)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(request.operator_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(school)
    }

    #[instrument(skip(self), fields(school_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let school = sqlx::query_as::<_, SchoolDBResponse>(&format!("{SELECT_WITH_COUNT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(school)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<SchoolId>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let schools = sqlx::query_as::<_, SchoolDBResponse>(&format!("{SELECT_WITH_COUNT} WHERE s.id = ANY($1)"))
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(schools.into_iter().map(|s| (s.id, s)).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let schools = sqlx::query_as::<_, SchoolDBResponse>(&format!(
            "{SELECT_WITH_COUNT} WHERE s.is_active AND ($1::uuid IS NULL OR s.operator_id = $1) ORDER BY s.name"
        ))
        .bind(filter.operator_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(schools)
    }

    #[instrument(skip(self), fields(school_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // Soft delete: students may still reference the school.
        let result = sqlx::query("UPDATE schools SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(school_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let school = sqlx::query_as::<_, SchoolDBResponse>(
            r#"
            UPDATE schools SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                city = COALESCE($4, city),
                parish = COALESCE($5, parish),
                phone = COALESCE($6, phone),
                email = COALESCE($7, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *,
                (SELECT COUNT(*) FROM students st WHERE st.school_id = schools.id AND st.is_active) AS student_count
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.address)
        .bind(&request.city)
        .bind(&request.parish)
        .bind(&request.phone)
        .bind(&request.email)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(school)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::handlers::{Students, Users};
    use crate::db::models::students::StudentCreateDBRequest;
    use crate::test_utils;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_applies_location_defaults(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let operator = Users::new(&mut conn)
            .create(&test_utils::user_create("op@example.com", Role::Operator))
            .await
            .unwrap();

        let mut repo = Schools::new(&mut conn);
        let school = repo
            .create(&test_utils::school_create("Belair High", operator.id))
            .await
            .unwrap();

        assert_eq!(school.city, "Mandeville");
        assert_eq!(school.parish, "Manchester");
        assert_eq!(school.student_count, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_student_count_only_counts_active(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let operator = Users::new(&mut conn)
            .create(&test_utils::user_create("op@example.com", Role::Operator))
            .await
            .unwrap();
        let parent = Users::new(&mut conn)
            .create(&test_utils::user_create("parent@example.com", Role::Parent))
            .await
            .unwrap();

        let school = Schools::new(&mut conn)
            .create(&test_utils::school_create("Belair High", operator.id))
            .await
            .unwrap();

        let mut students = Students::new(&mut conn);
        let enrolled = students
            .create(&StudentCreateDBRequest {
                school_id: Some(school.id),
                ..test_utils::student_create(parent.id, None)
            })
            .await
            .unwrap();
        let withdrawn = students
            .create(&StudentCreateDBRequest {
                school_id: Some(school.id),
                ..test_utils::student_create(parent.id, None)
            })
            .await
            .unwrap();
        students.delete(withdrawn.id).await.unwrap();

        let fetched = Schools::new(&mut conn).get_by_id(school.id).await.unwrap().unwrap();
        assert_eq!(fetched.student_count, 1);
        let _ = enrolled;
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_scoped_to_operator(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let op_a = Users::new(&mut conn)
            .create(&test_utils::user_create("op-a@example.com", Role::Operator))
            .await
            .unwrap();
        let op_b = Users::new(&mut conn)
            .create(&test_utils::user_create("op-b@example.com", Role::Operator))
            .await
            .unwrap();

        let mut repo = Schools::new(&mut conn);
        let school_a = repo.create(&test_utils::school_create("Belair High", op_a.id)).await.unwrap();
        let school_b = repo.create(&test_utils::school_create("DeCarteret", op_b.id)).await.unwrap();

        let for_a = repo.list(&SchoolFilter { operator_id: Some(op_a.id) }).await.unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].id, school_a.id);

        let for_b = repo.list(&SchoolFilter { operator_id: Some(op_b.id) }).await.unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].id, school_b.id);

        // No operator filter: everything
        let all = repo.list(&SchoolFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_hides_from_list(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let operator = Users::new(&mut conn)
            .create(&test_utils::user_create("op@example.com", Role::Operator))
            .await
            .unwrap();

        let mut repo = Schools::new(&mut conn);
        let school = repo
            .create(&test_utils::school_create("Closing Prep", operator.id))
            .await
            .unwrap();

        assert!(repo.delete(school.id).await.unwrap());
        let listed = repo.list(&SchoolFilter::default()).await.unwrap();
        assert!(listed.is_empty());
        // Still fetchable directly
        assert!(repo.get_by_id(school.id).await.unwrap().is_some());
    }
}
