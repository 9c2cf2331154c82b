//! Database models for notifications.

use crate::api::models::notifications::{DeliveryMethod, NotificationPriority, NotificationType};
use crate::types::{NotificationId, RouteId, StudentId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// The shared content of a fan-out: everything except the recipient.
/// One dispatch call materializes one row per resolved recipient, all
/// carrying the same content.
#[derive(Debug, Clone)]
pub struct NotificationContent {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub delivery_method: DeliveryMethod,
    pub related_route_id: Option<RouteId>,
    pub related_student_id: Option<StudentId>,
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationDBResponse {
    pub id: NotificationId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub delivery_method: DeliveryMethod,
    pub sms_sent: bool,
    pub email_sent: bool,
    pub related_route_id: Option<RouteId>,
    pub related_student_id: Option<StudentId>,
    pub created_at: DateTime<Utc>,
}
