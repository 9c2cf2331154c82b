//! Database repository for notifications.
//!
//! A broadcast to N recipients is N rows sharing the same content. The batch
//! insert runs in a single transaction so a fan-out either lands for every
//! recipient or for none.

use crate::types::{NotificationId, UserId, abbrev_uuid};
use crate::{
    api::models::notifications::NotificationType,
    db::{
        errors::Result,
        models::notifications::{NotificationContent, NotificationDBResponse},
    },
};
use sqlx::{Connection, PgConnection};
use tracing::instrument;

/// Filter for listing a recipient's notifications
#[derive(Debug, Clone)]
pub struct NotificationFilter {
    pub unread_only: bool,
    pub notification_type: Option<NotificationType>,
    pub limit: i64,
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self {
            unread_only: false,
            notification_type: None,
            limit: 50,
        }
    }
}

pub struct Notifications<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Notifications<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, content), fields(recipient_id = %abbrev_uuid(&recipient_id)), err)]
    pub async fn create(
        &mut self,
        sender_id: UserId,
        recipient_id: UserId,
        content: &NotificationContent,
    ) -> Result<NotificationDBResponse> {
        let notification = insert_one(&mut *self.db, sender_id, recipient_id, content).await?;
        Ok(notification)
    }

    /// Insert one row per recipient, atomically. Returns the created rows in
    /// recipient order. An empty recipient set is a no-op, not an error.
    #[instrument(skip(self, recipients, content), fields(count = recipients.len()), err)]
    pub async fn create_batch(
        &mut self,
        sender_id: UserId,
        recipients: &[UserId],
        content: &NotificationContent,
    ) -> Result<Vec<NotificationDBResponse>> {
        if recipients.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.db.begin().await?;
        let mut created = Vec::with_capacity(recipients.len());
        for &recipient_id in recipients {
            created.push(insert_one(&mut tx, sender_id, recipient_id, content).await?);
        }
        tx.commit().await?;

        Ok(created)
    }

    #[instrument(skip(self), fields(notification_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: NotificationId) -> Result<Option<NotificationDBResponse>> {
        let notification = sqlx::query_as::<_, NotificationDBResponse>("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(notification)
    }

    /// A recipient's inbox, newest first.
    #[instrument(skip(self, filter), fields(recipient_id = %abbrev_uuid(&recipient_id)), err)]
    pub async fn list_for_recipient(
        &mut self,
        recipient_id: UserId,
        filter: &NotificationFilter,
    ) -> Result<Vec<NotificationDBResponse>> {
        let notifications = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1
              AND (NOT $2 OR NOT is_read)
              AND ($3::notification_type IS NULL OR notification_type = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(recipient_id)
        .bind(filter.unread_only)
        .bind(filter.notification_type)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(notifications)
    }

    #[instrument(skip(self), fields(recipient_id = %abbrev_uuid(&recipient_id)), err)]
    pub async fn unread_count(&mut self, recipient_id: UserId) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT is_read")
                .bind(recipient_id)
                .fetch_one(&mut *self.db)
                .await?;
        Ok(count)
    }

    /// Mark one notification read. Scoped to the recipient: a user cannot
    /// mark someone else's notification.
    #[instrument(skip(self), fields(notification_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_read(&mut self, id: NotificationId, recipient_id: UserId) -> Result<Option<NotificationDBResponse>> {
        let notification = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND recipient_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(notification)
    }

    /// Mark every unread notification read. Returns how many were flipped.
    #[instrument(skip(self), fields(recipient_id = %abbrev_uuid(&recipient_id)), err)]
    pub async fn mark_all_read(&mut self, recipient_id: UserId) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete a notification from the recipient's inbox.
    #[instrument(skip(self), fields(notification_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: NotificationId, recipient_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record that the out-of-band email for this notification went out.
    #[instrument(skip(self), fields(notification_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_email_sent(&mut self, id: NotificationId) -> Result<()> {
        sqlx::query("UPDATE notifications SET email_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// Record that the out-of-band SMS for this notification went out.
    #[instrument(skip(self), fields(notification_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_sms_sent(&mut self, id: NotificationId) -> Result<()> {
        sqlx::query("UPDATE notifications SET sms_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}

async fn insert_one(
    db: &mut PgConnection,
    sender_id: UserId,
    recipient_id: UserId,
    content: &NotificationContent,
) -> Result<NotificationDBResponse> {
    let notification = sqlx::query_as::<_, NotificationDBResponse>(
        r#"
        INSERT INTO notifications (
            sender_id, recipient_id, title, message,
            notification_type, priority, delivery_method,
            related_route_id, related_student_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(sender_id)
    .bind(recipient_id)
    .bind(&content.title)
    .bind(&content.message)
    .bind(content.notification_type)
    .bind(content.priority)
    .bind(content.delivery_method)
    .bind(content.related_route_id)
    .bind(content.related_student_id)
    .fetch_one(db)
    .await?;
    Ok(notification)
}
