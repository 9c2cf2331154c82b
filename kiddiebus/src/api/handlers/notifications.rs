//! Handlers for the notification inbox and the staff send/broadcast surface.

use crate::api::models::notifications::{
    BroadcastRequest, DeliveryMethod, DispatchResponse, ListNotificationsQuery, MarkAllReadResponse,
    NotificationListResponse, NotificationPriority, NotificationResponse, NotificationSend, NotificationType,
};
use crate::api::models::users::CurrentUser;
use crate::broadcast::{self, RecipientCriteria};
use crate::db::handlers::{Notifications, notifications::NotificationFilter};
use crate::db::models::notifications::NotificationContent;
use crate::errors::{Error, Result};
use crate::{AppState, types::NotificationId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

const MAX_PAGE_SIZE: i64 = 200;

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    summary = "List own notifications",
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Inbox page with unread count", body = NotificationListResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<NotificationListResponse>> {
    let filter = NotificationFilter {
        unread_only: query.unread_only.unwrap_or(false),
        notification_type: query.notification_type,
        limit: query.limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notifications::new(&mut conn);
    let notifications = repo.list_for_recipient(current_user.id, &filter).await?;
    let unread_count = repo.unread_count(current_user.id).await?;

    Ok(Json(NotificationListResponse {
        notifications: notifications.into_iter().map(NotificationResponse::from).collect(),
        unread_count,
    }))
}

#[utoipa::path(
    get,
    path = "/notifications/{notification_id}",
    tag = "notifications",
    summary = "Get notification",
    responses(
        (status = 200, description = "Notification details", body = NotificationResponse),
        (status = 404, description = "Notification not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<NotificationId>,
) -> Result<Json<NotificationResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let notification = Notifications::new(&mut conn).get_by_id(notification_id).await?;

    // Someone else's notification reads as not-found, never as forbidden
    match notification {
        Some(n) if n.recipient_id == current_user.id => Ok(Json(NotificationResponse::from(n))),
        _ => Err(Error::NotFound {
            resource: "Notification".to_string(),
            id: notification_id.to_string(),
        }),
    }
}

#[utoipa::path(
    post,
    path = "/notifications",
    tag = "notifications",
    summary = "Send notification to one user",
    request_body = NotificationSend,
    responses(
        (status = 201, description = "Dispatch outcome", body = DispatchResponse),
        (status = 400, description = "Empty title or message"),
        (status = 403, description = "Forbidden"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn send_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(send): Json<NotificationSend>,
) -> Result<(StatusCode, Json<DispatchResponse>)> {
    let content = NotificationContent {
        title: send.title,
        message: send.message,
        notification_type: send.notification_type.unwrap_or(NotificationType::General),
        priority: send.priority.unwrap_or(NotificationPriority::Normal),
        delivery_method: send.delivery_method.unwrap_or(DeliveryMethod::InApp),
        related_route_id: send.related_route_id,
        related_student_id: send.related_student_id,
    };

    let outcome = broadcast::dispatch(
        &state.db,
        &current_user,
        &content,
        &RecipientCriteria::Explicit(send.recipient_id),
        &state.delivery,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

#[utoipa::path(
    post,
    path = "/notifications/broadcast",
    tag = "notifications",
    summary = "Broadcast notification",
    request_body = BroadcastRequest,
    responses(
        (status = 201, description = "Dispatch outcome", body = DispatchResponse),
        (status = 400, description = "Empty title or message"),
        (status = 403, description = "Forbidden"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn broadcast_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<BroadcastRequest>,
) -> Result<(StatusCode, Json<DispatchResponse>)> {
    let content = NotificationContent {
        title: request.title,
        message: request.message,
        notification_type: request.notification_type.unwrap_or(NotificationType::General),
        priority: request.priority.unwrap_or(NotificationPriority::Normal),
        delivery_method: request.delivery_method.unwrap_or(DeliveryMethod::InApp),
        related_route_id: request.route_id,
        related_student_id: None,
    };

    let outcome = broadcast::dispatch(
        &state.db,
        &current_user,
        &content,
        &RecipientCriteria::Filter {
            role: request.recipient_role,
            route_id: request.route_id,
        },
        &state.delivery,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

#[utoipa::path(
    post,
    path = "/notifications/{notification_id}/read",
    tag = "notifications",
    summary = "Mark notification read",
    responses(
        (status = 200, description = "Updated notification", body = NotificationResponse),
        (status = 404, description = "Notification not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<NotificationId>,
) -> Result<Json<NotificationResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let notification = Notifications::new(&mut conn)
        .mark_read(notification_id, current_user.id)
        .await?
        .ok_or(Error::NotFound {
            resource: "Notification".to_string(),
            id: notification_id.to_string(),
        })?;

    Ok(Json(NotificationResponse::from(notification)))
}

#[utoipa::path(
    post,
    path = "/notifications/read-all",
    tag = "notifications",
    summary = "Mark all notifications read",
    responses(
        (status = 200, description = "How many were updated", body = MarkAllReadResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<MarkAllReadResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let updated = Notifications::new(&mut conn).mark_all_read(current_user.id).await?;

    Ok(Json(MarkAllReadResponse { updated }))
}

#[utoipa::path(
    delete,
    path = "/notifications/{notification_id}",
    tag = "notifications",
    summary = "Delete notification",
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found"),
    ),
    security(("IdentityHeader" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<NotificationId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Notifications::new(&mut conn)
        .delete(notification_id, current_user.id)
        .await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Notification".to_string(),
            id: notification_id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}
