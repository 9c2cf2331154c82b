//! API request/response models for notifications.

use crate::api::models::users::Role;
use crate::db::models::notifications::NotificationDBResponse;
use crate::types::{NotificationId, RouteId, StudentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "notification_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    General,
    Delay,
    Emergency,
    Boarding,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "notification_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Urgent,
}

/// How the recipient should be reached beyond the in-app inbox. The dispatch
/// path only records this; the delivery worker acts on it afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "delivery_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    InApp,
    Sms,
    Email,
    All,
}

impl DeliveryMethod {
    pub fn wants_email(&self) -> bool {
        matches!(self, DeliveryMethod::Email | DeliveryMethod::All)
    }

    pub fn wants_sms(&self) -> bool {
        matches!(self, DeliveryMethod::Sms | DeliveryMethod::All)
    }
}

/// Body for `POST /notifications` - a direct send to one recipient.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationSend {
    #[schema(value_type = String, format = "uuid")]
    pub recipient_id: UserId,
    pub title: String,
    pub message: String,
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    pub delivery_method: Option<DeliveryMethod>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub related_route_id: Option<RouteId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub related_student_id: Option<StudentId>,
}

/// Body for `POST /notifications/broadcast`. `recipient_role` and `route_id`
/// combine as a conjunction: "parents on route X".
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    pub title: String,
    pub message: String,
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    pub delivery_method: Option<DeliveryMethod>,
    pub recipient_role: Option<Role>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub route_id: Option<RouteId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: NotificationId,
    #[schema(value_type = String, format = "uuid")]
    pub sender_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub recipient_id: UserId,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub delivery_method: DeliveryMethod,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub related_route_id: Option<RouteId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub related_student_id: Option<StudentId>,
    pub created_at: DateTime<Utc>,
}

/// Inbox listing: page of notifications plus the total unread count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationResponse>,
    pub unread_count: i64,
}

/// Result of a dispatch: how many recipients were resolved and materialized.
/// Zero is a valid outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchResponse {
    pub created_count: usize,
    pub notifications: Vec<NotificationResponse>,
}

/// Result of `POST /notifications/read-all`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListNotificationsQuery {
    /// Only unread notifications
    pub unread_only: Option<bool>,
    /// Restrict to one notification type
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    /// Maximum rows returned (default 50, capped at 200)
    pub limit: Option<i64>,
}

impl From<crate::broadcast::DispatchOutcome> for DispatchResponse {
    fn from(outcome: crate::broadcast::DispatchOutcome) -> Self {
        Self {
            created_count: outcome.created,
            notifications: outcome.notifications.into_iter().map(NotificationResponse::from).collect(),
        }
    }
}

impl From<NotificationDBResponse> for NotificationResponse {
    fn from(db: NotificationDBResponse) -> Self {
        Self {
            id: db.id,
            sender_id: db.sender_id,
            recipient_id: db.recipient_id,
            title: db.title,
            message: db.message,
            notification_type: db.notification_type,
            priority: db.priority,
            is_read: db.is_read,
            read_at: db.read_at,
            delivery_method: db.delivery_method,
            related_route_id: db.related_route_id,
            related_student_id: db.related_student_id,
            created_at: db.created_at,
        }
    }
}
