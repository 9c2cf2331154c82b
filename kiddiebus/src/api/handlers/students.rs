//! Handlers for students and the check-in flow.

use crate::api::models::boardings::{BoardingResponse, BoardingType, VerificationMethod};
use crate::api::models::students::{
    CheckInRequest, ListStudentsQuery, StudentCreate, StudentResponse, StudentUpdate,
};
use crate::api::models::users::{CurrentUser, Role};
use crate::api::models::notifications::{DeliveryMethod, NotificationPriority, NotificationType};
use crate::auth::scope;
use crate::broadcast::{self, RecipientCriteria};
use crate::db::handlers::{
    Boardings, Buses, Repository, Routes, Students, Users, boardings::BoardingFilter, students::StudentFilter,
};
use crate::db::models::boardings::BoardingRecordDBRequest;
use crate::db::models::notifications::NotificationContent;
use crate::db::models::students::{StudentCreateDBRequest, StudentDBResponse, StudentUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::{AppState, types::StudentId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use sqlx::PgConnection;

async fn load_student(conn: &mut PgConnection, student_id: StudentId) -> Result<StudentDBResponse> {
    Students::new(conn).get_by_id(student_id).await?.ok_or(Error::NotFound {
        resource: "Student".to_string(),
        id: student_id.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    summary = "List students",
    params(ListStudentsQuery),
    responses(
        (status = 200, description = "List of students", body = Vec<StudentResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_students(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListStudentsQuery>,
) -> Result<Json<Vec<StudentResponse>>> {
    // Parents get their own children regardless of what they ask for
    let parent_id = match current_user.role {
        Role::Parent => Some(current_user.id),
        _ => None,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let students = Students::new(&mut conn)
        .list(&StudentFilter {
            parent_id,
            route_id: query.route_id,
            ..Default::default()
        })
        .await?;

    Ok(Json(students.into_iter().map(StudentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    summary = "Register student",
    request_body = StudentCreate,
    responses(
        (status = 201, description = "Student registered", body = StudentResponse),
        (status = 400, description = "Invalid parent assignment"),
        (status = 403, description = "Forbidden"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_student(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>)> {
    let parent_id = match current_user.role {
        Role::Parent => {
            if let Some(explicit) = create.parent_id
                && explicit != current_user.id
            {
                return Err(Error::BadRequest {
                    message: "Parents may only register their own children".to_string(),
                });
            }
            current_user.id
        }
        _ => create.parent_id.ok_or(Error::BadRequest {
            message: "parent_id is required".to_string(),
        })?,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // The guardian on record must be an active parent account
    let parent = Users::new(&mut conn).get_by_id(parent_id).await?;
    match parent {
        Some(ref user) if user.is_active && user.role == Role::Parent => {}
        _ => {
            return Err(Error::BadRequest {
                message: "parent_id must reference an active parent account".to_string(),
            });
        }
    }

    let student = Students::new(&mut conn)
        .create(&StudentCreateDBRequest::new(parent_id, create))
        .await?;

    Ok((StatusCode::CREATED, Json(StudentResponse::from(student))))
}

#[utoipa::path(
    get,
    path = "/students/{student_id}",
    tag = "students",
    summary = "Get student",
    responses(
        (status = 200, description = "Student details", body = StudentResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_student(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(student_id): Path<StudentId>,
) -> Result<Json<StudentResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let student = load_student(&mut conn, student_id).await?;
    if !scope::can_view_student(&current_user, &student) {
        return Err(Error::InsufficientScope {
            action: "view".to_string(),
            resource: "this student".to_string(),
        });
    }

    Ok(Json(StudentResponse::from(student)))
}

#[utoipa::path(
    put,
    path = "/students/{student_id}",
    tag = "students",
    summary = "Update student",
    request_body = StudentUpdate,
    responses(
        (status = 200, description = "Updated student", body = StudentResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_student(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(student_id): Path<StudentId>,
    Json(update): Json<StudentUpdate>,
) -> Result<Json<StudentResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let student = load_student(&mut conn, student_id).await?;
    if !scope::can_manage_student(&current_user, &student) {
        return Err(Error::InsufficientScope {
            action: "update".to_string(),
            resource: "this student".to_string(),
        });
    }

    let student = Students::new(&mut conn)
        .update(student_id, &StudentUpdateDBRequest::from(update))
        .await?;

    Ok(Json(StudentResponse::from(student)))
}

#[utoipa::path(
    delete,
    path = "/students/{student_id}",
    tag = "students",
    summary = "Withdraw student",
    responses(
        (status = 204, description = "Student withdrawn"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_student(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(student_id): Path<StudentId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let student = load_student(&mut conn, student_id).await?;
    if !scope::can_manage_student(&current_user, &student) {
        return Err(Error::InsufficientScope {
            action: "withdraw".to_string(),
            resource: "this student".to_string(),
        });
    }

    Students::new(&mut conn).delete(student_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/students/card/{card_id}",
    tag = "students",
    summary = "Look up student by card",
    responses(
        (status = 200, description = "Student carrying the card", body = StudentResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No active student carries this card"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_student_by_card(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(card_id): Path<String>,
) -> Result<Json<StudentResponse>> {
    // Card lookup is a boarding-device operation, not a parent one
    scope::require_staff(&current_user, "look up", "cards")?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let student = Students::new(&mut conn)
        .get_by_card(&card_id)
        .await?
        .ok_or(Error::NotFound {
            resource: "Student card".to_string(),
            id: card_id,
        })?;

    Ok(Json(StudentResponse::from(student)))
}

#[utoipa::path(
    get,
    path = "/students/{student_id}/boardings",
    tag = "students",
    summary = "Boarding history",
    responses(
        (status = 200, description = "Boarding events, most recent first", body = Vec<BoardingResponse>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn student_boardings(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(student_id): Path<StudentId>,
) -> Result<Json<Vec<BoardingResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let student = load_student(&mut conn, student_id).await?;
    if !scope::can_view_student(&current_user, &student) {
        return Err(Error::InsufficientScope {
            action: "view boardings of".to_string(),
            resource: "this student".to_string(),
        });
    }

    let boardings = Boardings::new(&mut conn)
        .list_for_student(student_id, &BoardingFilter::default())
        .await?;

    Ok(Json(boardings.into_iter().map(BoardingResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/students/{student_id}/checkin",
    tag = "students",
    summary = "Record a boarding event",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Boarding recorded", body = BoardingResponse),
        (status = 400, description = "Invalid check-in"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student, route, or bus not found"),
        (status = 409, description = "Already recorded for this student today"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all, fields(student_id = %student_id))]
pub async fn checkin(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(student_id): Path<StudentId>,
    Json(request): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<BoardingResponse>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let student = load_student(&mut conn, student_id).await?;
    if !student.is_active {
        return Err(Error::BadRequest {
            message: "Student is not active".to_string(),
        });
    }

    let route_id = request.route_id.or(student.route_id).ok_or(Error::BadRequest {
        message: "Student has no assigned route; route_id is required".to_string(),
    })?;
    let route = Routes::new(&mut conn).get_by_id(route_id).await?.ok_or(Error::NotFound {
        resource: "Route".to_string(),
        id: route_id.to_string(),
    })?;
    if !scope::can_verify_boarding(&current_user, &route) {
        return Err(Error::InsufficientScope {
            action: "record boardings on".to_string(),
            resource: "this route".to_string(),
        });
    }

    let bus = Buses::new(&mut conn)
        .get_by_id(request.bus_id)
        .await?
        .ok_or(Error::NotFound {
            resource: "Bus".to_string(),
            id: request.bus_id.to_string(),
        })?;

    if request.latitude.is_some() != request.longitude.is_some() {
        return Err(Error::BadRequest {
            message: "latitude and longitude must be provided together".to_string(),
        });
    }

    // The daily counter is keyed by the reporting day, not the UTC day, so a
    // late-evening pickup does not bleed into tomorrow
    let now = Utc::now();
    let boarding_day = now.with_timezone(&state.reporting_offset).date_naive();
    let boarding_type = request.boarding_type;

    let record = BoardingRecordDBRequest {
        student_id,
        bus_id: bus.id,
        route_id,
        boarding_type,
        boarding_time: now,
        boarding_day,
        latitude: request.latitude,
        longitude: request.longitude,
        verified_by_id: current_user.id,
        verification_method: request.verification_method.unwrap_or(VerificationMethod::Card),
        notes: request.notes,
    };

    let boarding = match Boardings::new(&mut conn).record(&record).await {
        Ok(boarding) => boarding,
        Err(e) if e.is_duplicate_boarding() => {
            return Err(Error::DuplicateBoarding {
                student_id,
                boarding_type: boarding_type.to_string(),
                day: boarding_day,
            });
        }
        Err(e) => return Err(Error::Database(e)),
    };
    drop(conn);

    // Tell the parent. The boarding row is already committed, so a failed
    // notification must not fail the check-in.
    let verb = match boarding_type {
        BoardingType::Pickup => "boarded",
        BoardingType::Dropoff => "got off",
    };
    let content = NotificationContent {
        title: format!("{} {} the bus", student.first_name, verb),
        message: format!(
            "{} {} {} bus {} on route {}.",
            student.first_name, student.last_name, verb, bus.registration_number, route.name
        ),
        notification_type: NotificationType::Boarding,
        priority: NotificationPriority::Normal,
        delivery_method: DeliveryMethod::All,
        related_route_id: Some(route_id),
        related_student_id: Some(student_id),
    };
    if let Err(e) = broadcast::dispatch(
        &state.db,
        &current_user,
        &content,
        &RecipientCriteria::Explicit(student.parent_id),
        &state.delivery,
    )
    .await
    {
        tracing::warn!(error = %e, "Boarding recorded but parent notification failed");
    }

    let response = BoardingResponse::from(boarding).with_student(StudentResponse::from(student));
    Ok((StatusCode::CREATED, Json(response)))
}
