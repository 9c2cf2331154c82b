//! Handlers for the bus fleet.

use crate::api::models::buses::{BusCreate, BusLocationUpdate, BusResponse, BusUpdate, ListBusesQuery};
use crate::api::models::users::CurrentUser;
use crate::auth::scope;
use crate::db::handlers::{Buses, Repository, buses::BusFilter};
use crate::db::models::buses::{BusCreateDBRequest, BusUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::{AppState, types::BusId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/buses",
    tag = "buses",
    summary = "List buses",
    params(ListBusesQuery),
    responses(
        (status = 200, description = "List of buses", body = Vec<BusResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_buses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListBusesQuery>,
) -> Result<Json<Vec<BusResponse>>> {
    // Buses are shared reference data: any authenticated user may list them
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let buses = Buses::new(&mut conn).list(&BusFilter { status: query.status }).await?;

    Ok(Json(buses.into_iter().map(BusResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/buses",
    tag = "buses",
    summary = "Register bus",
    request_body = BusCreate,
    responses(
        (status = 201, description = "Bus registered", body = BusResponse),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Registration number already exists"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_bus(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<BusCreate>,
) -> Result<(StatusCode, Json<BusResponse>)> {
    scope::require_staff(&current_user, "register", "buses")?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let bus = Buses::new(&mut conn).create(&BusCreateDBRequest::from(create)).await?;

    Ok((StatusCode::CREATED, Json(BusResponse::from(bus))))
}

#[utoipa::path(
    get,
    path = "/buses/{bus_id}",
    tag = "buses",
    summary = "Get bus",
    responses(
        (status = 200, description = "Bus details", body = BusResponse),
        (status = 404, description = "Bus not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_bus(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(bus_id): Path<BusId>,
) -> Result<Json<BusResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let bus = Buses::new(&mut conn).get_by_id(bus_id).await?.ok_or(Error::NotFound {
        resource: "Bus".to_string(),
        id: bus_id.to_string(),
    })?;

    Ok(Json(BusResponse::from(bus)))
}

#[utoipa::path(
    put,
    path = "/buses/{bus_id}",
    tag = "buses",
    summary = "Update bus",
    request_body = BusUpdate,
    responses(
        (status = 200, description = "Updated bus", body = BusResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Bus not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_bus(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(bus_id): Path<BusId>,
    Json(update): Json<BusUpdate>,
) -> Result<Json<BusResponse>> {
    scope::require_staff(&current_user, "update", "buses")?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let bus = Buses::new(&mut conn)
        .update(bus_id, &BusUpdateDBRequest::from(update))
        .await?;

    Ok(Json(BusResponse::from(bus)))
}

#[utoipa::path(
    put,
    path = "/buses/{bus_id}/location",
    tag = "buses",
    summary = "Update bus location",
    request_body = BusLocationUpdate,
    responses(
        (status = 200, description = "Updated bus", body = BusResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Bus not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_bus_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(bus_id): Path<BusId>,
    Json(location): Json<BusLocationUpdate>,
) -> Result<Json<BusResponse>> {
    scope::require_staff(&current_user, "report location for", "buses")?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let bus = Buses::new(&mut conn)
        .update_location(bus_id, location.latitude, location.longitude)
        .await?;

    Ok(Json(BusResponse::from(bus)))
}

#[utoipa::path(
    delete,
    path = "/buses/{bus_id}",
    tag = "buses",
    summary = "Retire bus",
    responses(
        (status = 204, description = "Bus retired"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Bus not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_bus(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(bus_id): Path<BusId>,
) -> Result<StatusCode> {
    scope::require_staff(&current_user, "retire", "buses")?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Buses::new(&mut conn).delete(bus_id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Bus".to_string(),
            id: bus_id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}
