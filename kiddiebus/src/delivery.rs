//! Out-of-band notification delivery.
//!
//! Dispatch (see [`crate::broadcast`]) only writes inbox rows; anything beyond
//! the in-app inbox happens here, after commit, off the request path. Created
//! notification ids are handed to a background worker over an unbounded mpsc
//! channel. The worker loads each notification, sends email when the delivery
//! method asks for it, and flips the `email_sent`/`sms_sent` bookkeeping
//! flags. Delivery is fire-and-forget: failures are logged, never retried,
//! and never fail the request that created the notification.

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    db::handlers::{Notifications, Repository, Users},
    email::EmailService,
    errors::{Error, Result},
    types::NotificationId,
};

/// Handle for enqueueing notifications for out-of-band delivery.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    tx: Option<mpsc::UnboundedSender<NotificationId>>,
}

impl DeliveryQueue {
    /// A queue that drops everything. For tests and for deployments without
    /// a delivery worker.
    pub fn noop() -> Self {
        Self { tx: None }
    }

    /// Hand a notification to the worker. Never fails: once the row is
    /// committed, delivery problems are the worker's to log.
    pub fn enqueue(&self, id: NotificationId) {
        if let Some(tx) = &self.tx
            && tx.send(id).is_err()
        {
            tracing::debug!(notification_id = %id, "Delivery worker gone, dropping notification delivery");
        }
    }
}

/// Spawn the delivery worker. Returns the queue handle; the worker runs until
/// the token is cancelled and the channel drains.
pub fn start_delivery_worker(
    db: PgPool,
    config: &Config,
    shutdown: CancellationToken,
) -> Result<(DeliveryQueue, tokio::task::JoinHandle<()>)> {
    let email_service = EmailService::new(config)?;
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(run_worker(db, email_service, rx, shutdown));

    Ok((DeliveryQueue { tx: Some(tx) }, handle))
}

async fn run_worker(
    db: PgPool,
    email_service: EmailService,
    mut rx: mpsc::UnboundedReceiver<NotificationId>,
    shutdown: CancellationToken,
) {
    tracing::info!("Notification delivery worker started");
    loop {
        let id = tokio::select! {
            id = rx.recv() => match id {
                Some(id) => id,
                None => break,
            },
            _ = shutdown.cancelled() => {
                tracing::info!("Notification delivery worker shutting down");
                break;
            }
        };

        if let Err(e) = deliver_one(&db, &email_service, id).await {
            tracing::warn!(notification_id = %id, error = %e, "Notification delivery failed");
        }
    }
}

async fn deliver_one(db: &PgPool, email_service: &EmailService, id: NotificationId) -> Result<()> {
    let mut conn = db.acquire().await.map_err(crate::db::errors::DbError::from)?;

    let Some(notification) = Notifications::new(&mut conn).get_by_id(id).await? else {
        tracing::debug!(notification_id = %id, "Notification deleted before delivery, skipping");
        return Ok(());
    };

    let Some(recipient) = Users::new(&mut conn).get_by_id(notification.recipient_id).await? else {
        return Err(Error::Internal {
            operation: format!("load recipient for notification {id}"),
        });
    };

    if notification.delivery_method.wants_email() && !notification.email_sent {
        let to_name = format!("{} {}", recipient.first_name, recipient.last_name);
        email_service
            .send_notification_email(&recipient.email, Some(&to_name), &notification.title, &notification.message)
            .await?;
        Notifications::new(&mut conn).mark_email_sent(id).await?;
        tracing::debug!(notification_id = %id, "Notification email sent");
    }

    if notification.delivery_method.wants_sms() && !notification.sms_sent {
        // No SMS gateway is wired up yet; record the attempt so the inbox
        // row does not look perpetually pending.
        match &recipient.phone {
            Some(phone) => tracing::info!(notification_id = %id, phone = %phone, "SMS delivery requested (gateway not configured)"),
            None => tracing::debug!(notification_id = %id, "SMS requested but recipient has no phone number"),
        }
        Notifications::new(&mut conn).mark_sms_sent(id).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::notifications::DeliveryMethod;
    use crate::api::models::users::Role;
    use crate::test_utils;
    use std::time::Duration;

    async fn wait_for<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if check().await {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("delivery did not complete in time");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_worker_sends_email_and_flips_flag(pool: sqlx::PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let config = test_utils::create_test_config(dir.path());

        let mut conn = pool.acquire().await.unwrap();
        let sender = Users::new(&mut conn)
            .create(&test_utils::user_create("admin@example.com", Role::Admin))
            .await
            .unwrap();
        let recipient = Users::new(&mut conn)
            .create(&test_utils::user_create("parent@example.com", Role::Parent))
            .await
            .unwrap();

        let mut content = test_utils::notification_content("Bus delayed");
        content.delivery_method = DeliveryMethod::Email;
        let notification = Notifications::new(&mut conn)
            .create(sender.id, recipient.id, &content)
            .await
            .unwrap();
        drop(conn);

        let shutdown = CancellationToken::new();
        let (queue, handle) = start_delivery_worker(pool.clone(), &config, shutdown.clone()).unwrap();
        queue.enqueue(notification.id);

        let pool_for_check = pool.clone();
        wait_for(move || {
            let pool = pool_for_check.clone();
            async move {
                let mut conn = pool.acquire().await.unwrap();
                let n = Notifications::new(&mut conn).get_by_id(notification.id).await.unwrap().unwrap();
                n.email_sent
            }
        })
        .await;

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_in_app_only_notification_is_untouched(pool: sqlx::PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let config = test_utils::create_test_config(dir.path());

        let mut conn = pool.acquire().await.unwrap();
        let sender = Users::new(&mut conn)
            .create(&test_utils::user_create("admin@example.com", Role::Admin))
            .await
            .unwrap();
        let recipient = Users::new(&mut conn)
            .create(&test_utils::user_create("parent@example.com", Role::Parent))
            .await
            .unwrap();

        let notification = Notifications::new(&mut conn)
            .create(sender.id, recipient.id, &test_utils::notification_content("Inbox only"))
            .await
            .unwrap();

        let email_service = EmailService::new(&config).unwrap();
        deliver_one(&pool, &email_service, notification.id).await.unwrap();

        let n = Notifications::new(&mut conn).get_by_id(notification.id).await.unwrap().unwrap();
        assert!(!n.email_sent);
        assert!(!n.sms_sent);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_noop_queue_drops_silently() {
        DeliveryQueue::noop().enqueue(uuid::Uuid::new_v4());
    }
}
