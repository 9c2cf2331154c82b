//! Handlers for bus routes.

use crate::api::models::routes::{ListRoutesQuery, RouteCreate, RouteResponse, RouteUpdate};
use crate::api::models::students::StudentResponse;
use crate::api::models::users::{CurrentUser, Role};
use crate::auth::scope;
use crate::db::handlers::{Repository, Routes, Students, routes::RouteFilter};
use crate::db::models::routes::{RouteCreateDBRequest, RouteDBResponse, RouteUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::{AppState, types::RouteId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgConnection;

async fn load_route(conn: &mut PgConnection, route_id: RouteId) -> Result<RouteDBResponse> {
    Routes::new(conn).get_by_id(route_id).await?.ok_or(Error::NotFound {
        resource: "Route".to_string(),
        id: route_id.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/routes",
    tag = "routes",
    summary = "List routes",
    params(ListRoutesQuery),
    responses(
        (status = 200, description = "List of routes", body = Vec<RouteResponse>),
        (status = 403, description = "Forbidden"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_routes(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListRoutesQuery>,
) -> Result<Json<Vec<RouteResponse>>> {
    scope::require_staff(&current_user, "list", "routes")?;

    // Operators only ever see their own routes, whatever the query says
    let operator_id = match current_user.role {
        Role::Admin => query.operator_id,
        _ => Some(current_user.id),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let routes = Routes::new(&mut conn)
        .list(&RouteFilter {
            status: query.status,
            operator_id,
        })
        .await?;

    Ok(Json(routes.into_iter().map(RouteResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/routes",
    tag = "routes",
    summary = "Create route",
    request_body = RouteCreate,
    responses(
        (status = 201, description = "Route created", body = RouteResponse),
        (status = 403, description = "Forbidden"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_route(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<RouteCreate>,
) -> Result<(StatusCode, Json<RouteResponse>)> {
    scope::require_staff(&current_user, "create", "routes")?;

    // Only admins may assign a route to a different operator
    if let Some(operator_id) = create.operator_id
        && operator_id != current_user.id
    {
        scope::require_admin(&current_user, "routes for other operators")?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let route = Routes::new(&mut conn)
        .create(&RouteCreateDBRequest::new(current_user.id, create))
        .await?;

    Ok((StatusCode::CREATED, Json(RouteResponse::from(route))))
}

#[utoipa::path(
    get,
    path = "/routes/{route_id}",
    tag = "routes",
    summary = "Get route",
    responses(
        (status = 200, description = "Route details", body = RouteResponse),
        (status = 404, description = "Route not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_route(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(route_id): Path<RouteId>,
) -> Result<Json<RouteResponse>> {
    // Readable by any authenticated user: parents see their child's route
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let route = load_route(&mut conn, route_id).await?;

    Ok(Json(RouteResponse::from(route)))
}

#[utoipa::path(
    put,
    path = "/routes/{route_id}",
    tag = "routes",
    summary = "Update route",
    request_body = RouteUpdate,
    responses(
        (status = 200, description = "Updated route", body = RouteResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Route not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_route(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(route_id): Path<RouteId>,
    Json(update): Json<RouteUpdate>,
) -> Result<Json<RouteResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let route = load_route(&mut conn, route_id).await?;
    if !scope::can_manage_route(&current_user, &route) {
        return Err(Error::InsufficientScope {
            action: "update".to_string(),
            resource: "this route".to_string(),
        });
    }

    let route = Routes::new(&mut conn)
        .update(route_id, &RouteUpdateDBRequest::from(update))
        .await?;

    Ok(Json(RouteResponse::from(route)))
}

#[utoipa::path(
    delete,
    path = "/routes/{route_id}",
    tag = "routes",
    summary = "Deactivate route",
    responses(
        (status = 204, description = "Route deactivated"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Route not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_route(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(route_id): Path<RouteId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let route = load_route(&mut conn, route_id).await?;
    if !scope::can_manage_route(&current_user, &route) {
        return Err(Error::InsufficientScope {
            action: "deactivate".to_string(),
            resource: "this route".to_string(),
        });
    }

    Routes::new(&mut conn).delete(route_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/routes/{route_id}/students",
    tag = "routes",
    summary = "List students on route",
    responses(
        (status = 200, description = "Active students on the route", body = Vec<StudentResponse>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Route not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn route_students(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(route_id): Path<RouteId>,
) -> Result<Json<Vec<StudentResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let route = load_route(&mut conn, route_id).await?;
    // The roster names other people's children; only the route's own
    // operator or an admin gets it
    if !scope::can_manage_route(&current_user, &route) {
        return Err(Error::InsufficientScope {
            action: "view the roster of".to_string(),
            resource: "this route".to_string(),
        });
    }

    let students = Students::new(&mut conn).list_on_route(route_id).await?;
    Ok(Json(students.into_iter().map(StudentResponse::from).collect()))
}
