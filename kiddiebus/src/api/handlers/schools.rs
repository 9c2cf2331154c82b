//! Handlers for schools.

use crate::api::models::schools::{SchoolCreate, SchoolResponse, SchoolUpdate};
use crate::api::models::students::StudentResponse;
use crate::api::models::users::{CurrentUser, Role};
use crate::auth::scope;
use crate::db::handlers::{Repository, Schools, Students, schools::SchoolFilter, students::StudentFilter};
use crate::db::models::schools::{SchoolCreateDBRequest, SchoolDBResponse, SchoolUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::{AppState, types::SchoolId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sqlx::PgConnection;

async fn load_school(conn: &mut PgConnection, school_id: SchoolId) -> Result<SchoolDBResponse> {
    Schools::new(conn).get_by_id(school_id).await?.ok_or(Error::NotFound {
        resource: "School".to_string(),
        id: school_id.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/schools",
    tag = "schools",
    summary = "List managed schools",
    responses(
        (status = 200, description = "Schools managed by the caller", body = Vec<SchoolResponse>),
        (status = 403, description = "Forbidden"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_schools(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<SchoolResponse>>> {
    scope::require_staff(&current_user, "list", "schools")?;

    let operator_id = match current_user.role {
        Role::Admin => None,
        _ => Some(current_user.id),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let schools = Schools::new(&mut conn).list(&SchoolFilter { operator_id }).await?;

    Ok(Json(schools.into_iter().map(SchoolResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/schools/all",
    tag = "schools",
    summary = "List all schools",
    responses(
        (status = 200, description = "All active schools", body = Vec<SchoolResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_all_schools(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> Result<Json<Vec<SchoolResponse>>> {
    // Dropdown data for registration forms: any authenticated user
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let schools = Schools::new(&mut conn).list(&SchoolFilter::default()).await?;

    Ok(Json(schools.into_iter().map(SchoolResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/schools",
    tag = "schools",
    summary = "Create school",
    request_body = SchoolCreate,
    responses(
        (status = 201, description = "School created", body = SchoolResponse),
        (status = 403, description = "Forbidden"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_school(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<SchoolCreate>,
) -> Result<(StatusCode, Json<SchoolResponse>)> {
    scope::require_staff(&current_user, "create", "schools")?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let school = Schools::new(&mut conn)
        .create(&SchoolCreateDBRequest::new(current_user.id, create))
        .await?;

    Ok((StatusCode::CREATED, Json(SchoolResponse::from(school))))
}

#[utoipa::path(
    get,
    path = "/schools/{school_id}",
    tag = "schools",
    summary = "Get school",
    responses(
        (status = 200, description = "School details", body = SchoolResponse),
        (status = 404, description = "School not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_school(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(school_id): Path<SchoolId>,
) -> Result<Json<SchoolResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let school = load_school(&mut conn, school_id).await?;

    Ok(Json(SchoolResponse::from(school)))
}

#[utoipa::path(
    put,
    path = "/schools/{school_id}",
    tag = "schools",
    summary = "Update school",
    request_body = SchoolUpdate,
    responses(
        (status = 200, description = "Updated school", body = SchoolResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "School not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_school(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(school_id): Path<SchoolId>,
    Json(update): Json<SchoolUpdate>,
) -> Result<Json<SchoolResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let school = load_school(&mut conn, school_id).await?;
    if !scope::can_manage_school(&current_user, &school) {
        return Err(Error::InsufficientScope {
            action: "update".to_string(),
            resource: "this school".to_string(),
        });
    }

    let school = Schools::new(&mut conn)
        .update(school_id, &SchoolUpdateDBRequest::from(update))
        .await?;

    Ok(Json(SchoolResponse::from(school)))
}

#[utoipa::path(
    delete,
    path = "/schools/{school_id}",
    tag = "schools",
    summary = "Deactivate school",
    responses(
        (status = 204, description = "School deactivated"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "School not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_school(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(school_id): Path<SchoolId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let school = load_school(&mut conn, school_id).await?;
    if !scope::can_manage_school(&current_user, &school) {
        return Err(Error::InsufficientScope {
            action: "deactivate".to_string(),
            resource: "this school".to_string(),
        });
    }

    Schools::new(&mut conn).delete(school_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/schools/{school_id}/students",
    tag = "schools",
    summary = "List students at school",
    responses(
        (status = 200, description = "Active students enrolled at the school", body = Vec<StudentResponse>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "School not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn school_students(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(school_id): Path<SchoolId>,
) -> Result<Json<Vec<StudentResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let school = load_school(&mut conn, school_id).await?;
    if !scope::can_manage_school(&current_user, &school) {
        return Err(Error::InsufficientScope {
            action: "view enrollment of".to_string(),
            resource: "this school".to_string(),
        });
    }

    let students = Students::new(&mut conn)
        .list(&StudentFilter {
            school_id: Some(school_id),
            ..Default::default()
        })
        .await?;

    Ok(Json(students.into_iter().map(StudentResponse::from).collect()))
}
