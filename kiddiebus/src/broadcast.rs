//! Recipient resolution and notification fan-out.
//!
//! A dispatch turns one piece of content plus a recipient description into N
//! inbox rows, atomically. Resolution and insertion are separate steps:
//! [`resolve_recipients`] answers "who", [`dispatch`] materializes the rows
//! in a single transaction and hands the ids to the delivery worker after
//! commit.

use std::collections::HashSet;

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use crate::{
    api::models::users::{CurrentUser, Role},
    auth::scope,
    db::{
        self,
        handlers::Notifications,
        models::notifications::{NotificationContent, NotificationDBResponse},
    },
    delivery::DeliveryQueue,
    errors::{Error, Result},
    types::{RouteId, UserId},
};

/// Who a dispatch addresses.
#[derive(Debug, Clone)]
pub enum RecipientCriteria {
    /// One specific user; resolves to nobody if the account is gone or
    /// deactivated.
    Explicit(UserId),
    /// All active users matching the conjunction of the given filters. With
    /// a `route_id`, the base set is the distinct parents of active students
    /// on that route.
    Filter {
        role: Option<Role>,
        route_id: Option<RouteId>,
    },
}

/// Result of a dispatch. `created` always equals the number of resolved
/// recipients; zero is a valid outcome.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub created: usize,
    pub notifications: Vec<NotificationDBResponse>,
}

/// Resolve criteria to a set of active recipient ids.
///
/// The set structurally rules out duplicate sends: a parent with two active
/// students on a route resolves once. Inactive users never qualify, and
/// parents whose only students on the route are inactive are excluded.
#[instrument(skip(db, criteria), err)]
pub async fn resolve_recipients(
    db: &mut PgConnection,
    criteria: &RecipientCriteria,
) -> db::errors::Result<HashSet<UserId>> {
    let ids: Vec<UserId> = match criteria {
        RecipientCriteria::Explicit(user_id) => {
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 AND is_active")
                .bind(user_id)
                .fetch_all(&mut *db)
                .await?
        }
        RecipientCriteria::Filter {
            role,
            route_id: Some(route_id),
        } => {
            sqlx::query_scalar(
                r#"
                SELECT DISTINCT u.id
                FROM users u
                JOIN students s ON s.parent_id = u.id
                WHERE u.is_active
                  AND s.is_active
                  AND s.route_id = $1
                  AND ($2::user_role IS NULL OR u.role = $2)
                "#,
            )
            .bind(route_id)
            .bind(*role)
            .fetch_all(&mut *db)
            .await?
        }
        RecipientCriteria::Filter { role, route_id: None } => {
            sqlx::query_scalar("SELECT id FROM users WHERE is_active AND ($1::user_role IS NULL OR role = $1)")
                .bind(*role)
                .fetch_all(&mut *db)
                .await?
        }
    };

    Ok(ids.into_iter().collect())
}

/// Fan the content out to every resolved recipient, all-or-nothing, then
/// enqueue the created rows for out-of-band delivery.
#[instrument(skip(db, sender, content, criteria, delivery), fields(sender_id = %sender.id), err)]
pub async fn dispatch(
    db: &PgPool,
    sender: &CurrentUser,
    content: &NotificationContent,
    criteria: &RecipientCriteria,
    delivery: &DeliveryQueue,
) -> Result<DispatchOutcome> {
    if !scope::can_send_notifications(sender) {
        return Err(Error::InsufficientScope {
            action: "send".to_string(),
            resource: "notifications".to_string(),
        });
    }
    if content.title.trim().is_empty() || content.message.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Notification title and message must not be empty".to_string(),
        });
    }

    let mut conn = db.acquire().await.map_err(db::errors::DbError::from)?;
    let recipients = resolve_recipients(&mut conn, criteria).await?;

    // Stable order keeps responses and logs deterministic
    let mut recipients: Vec<UserId> = recipients.into_iter().collect();
    recipients.sort_unstable();

    let notifications = Notifications::new(&mut conn)
        .create_batch(sender.id, &recipients, content)
        .await?;
    drop(conn);

    // Rows are committed; delivery is fire-and-forget from here
    for notification in &notifications {
        if notification.delivery_method.wants_email() || notification.delivery_method.wants_sms() {
            delivery.enqueue(notification.id);
        }
    }

    tracing::info!(created = notifications.len(), "Notification dispatch complete");
    Ok(DispatchOutcome {
        created: notifications.len(),
        notifications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Repository, Routes, Students, Users};
    use crate::test_utils;
    use sqlx::PgPool;
    use uuid::Uuid;

    async fn seed_user(pool: &PgPool, email: &str, role: Role) -> crate::db::models::users::UserDBResponse {
        let mut conn = pool.acquire().await.unwrap();
        Users::new(&mut conn)
            .create(&test_utils::user_create(email, role))
            .await
            .unwrap()
    }

    fn as_current(user: &crate::db::models::users::UserDBResponse) -> CurrentUser {
        CurrentUser::from(user.clone())
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_explicit_resolution(pool: PgPool) {
        let parent = seed_user(&pool, "parent@example.com", Role::Parent).await;

        let mut conn = pool.acquire().await.unwrap();
        let resolved = resolve_recipients(&mut conn, &RecipientCriteria::Explicit(parent.id))
            .await
            .unwrap();
        assert_eq!(resolved, HashSet::from([parent.id]));

        // Unknown user resolves to nobody
        let resolved = resolve_recipients(&mut conn, &RecipientCriteria::Explicit(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(resolved.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_explicit_resolution_skips_inactive(pool: PgPool) {
        let parent = seed_user(&pool, "parent@example.com", Role::Parent).await;

        let mut conn = pool.acquire().await.unwrap();
        Users::new(&mut conn).delete(parent.id).await.unwrap();

        let resolved = resolve_recipients(&mut conn, &RecipientCriteria::Explicit(parent.id))
            .await
            .unwrap();
        assert!(resolved.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_role_filter_resolution(pool: PgPool) {
        let p1 = seed_user(&pool, "p1@example.com", Role::Parent).await;
        let p2 = seed_user(&pool, "p2@example.com", Role::Parent).await;
        let op = seed_user(&pool, "op@example.com", Role::Operator).await;

        let mut conn = pool.acquire().await.unwrap();
        let parents = resolve_recipients(
            &mut conn,
            &RecipientCriteria::Filter {
                role: Some(Role::Parent),
                route_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(parents, HashSet::from([p1.id, p2.id]));

        let everyone = resolve_recipients(
            &mut conn,
            &RecipientCriteria::Filter {
                role: None,
                route_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(everyone, HashSet::from([p1.id, p2.id, op.id]));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_route_filter_deduplicates_parents(pool: PgPool) {
        let op = seed_user(&pool, "op@example.com", Role::Operator).await;
        let parent = seed_user(&pool, "parent@example.com", Role::Parent).await;
        let other = seed_user(&pool, "other@example.com", Role::Parent).await;

        let mut conn = pool.acquire().await.unwrap();
        let route = Routes::new(&mut conn)
            .create(&test_utils::route_create("North", op.id, None))
            .await
            .unwrap();

        // Two active children on the route: parent must resolve once
        let mut students = Students::new(&mut conn);
        students
            .create(&test_utils::student_create(parent.id, Some(route.id)))
            .await
            .unwrap();
        students
            .create(&test_utils::student_create(parent.id, Some(route.id)))
            .await
            .unwrap();
        // `other`'s only child on the route is inactive: excluded
        let withdrawn = students
            .create(&test_utils::student_create(other.id, Some(route.id)))
            .await
            .unwrap();
        students.delete(withdrawn.id).await.unwrap();

        let resolved = resolve_recipients(
            &mut conn,
            &RecipientCriteria::Filter {
                role: None,
                route_id: Some(route.id),
            },
        )
        .await
        .unwrap();
        assert_eq!(resolved, HashSet::from([parent.id]));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_route_filter_excludes_inactive_parents(pool: PgPool) {
        let op = seed_user(&pool, "op@example.com", Role::Operator).await;
        let parent = seed_user(&pool, "parent@example.com", Role::Parent).await;

        let mut conn = pool.acquire().await.unwrap();
        let route = Routes::new(&mut conn)
            .create(&test_utils::route_create("North", op.id, None))
            .await
            .unwrap();
        Students::new(&mut conn)
            .create(&test_utils::student_create(parent.id, Some(route.id)))
            .await
            .unwrap();
        Users::new(&mut conn).delete(parent.id).await.unwrap();

        let resolved = resolve_recipients(
            &mut conn,
            &RecipientCriteria::Filter {
                role: None,
                route_id: Some(route.id),
            },
        )
        .await
        .unwrap();
        assert!(resolved.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_dispatch_creates_one_row_per_recipient(pool: PgPool) {
        let admin = seed_user(&pool, "admin@example.com", Role::Admin).await;
        for i in 0..10 {
            seed_user(&pool, &format!("p{i}@example.com"), Role::Parent).await;
        }
        // Two deactivated parents must be skipped
        for i in 0..2 {
            let gone = seed_user(&pool, &format!("gone{i}@example.com"), Role::Parent).await;
            let mut conn = pool.acquire().await.unwrap();
            Users::new(&mut conn).delete(gone.id).await.unwrap();
        }

        let outcome = dispatch(
            &pool,
            &as_current(&admin),
            &test_utils::notification_content("School closed"),
            &RecipientCriteria::Filter {
                role: Some(Role::Parent),
                route_id: None,
            },
            &DeliveryQueue::noop(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.created, 10);
        assert_eq!(outcome.notifications.len(), 10);
        let distinct: HashSet<_> = outcome.notifications.iter().map(|n| n.recipient_id).collect();
        assert_eq!(distinct.len(), 10);
        assert!(outcome.notifications.iter().all(|n| n.title == "School closed"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_dispatch_zero_recipients_is_success(pool: PgPool) {
        let admin = seed_user(&pool, "admin@example.com", Role::Admin).await;

        let outcome = dispatch(
            &pool,
            &as_current(&admin),
            &test_utils::notification_content("Anyone there?"),
            &RecipientCriteria::Filter {
                role: Some(Role::Parent),
                route_id: None,
            },
            &DeliveryQueue::noop(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.created, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_dispatch_rejects_parents(pool: PgPool) {
        let parent = seed_user(&pool, "parent@example.com", Role::Parent).await;

        let err = dispatch(
            &pool,
            &as_current(&parent),
            &test_utils::notification_content("Nope"),
            &RecipientCriteria::Filter {
                role: None,
                route_id: None,
            },
            &DeliveryQueue::noop(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_dispatch_rejects_empty_content(pool: PgPool) {
        let admin = seed_user(&pool, "admin@example.com", Role::Admin).await;

        let mut content = test_utils::notification_content("Title");
        content.message = "   ".to_string();

        let err = dispatch(
            &pool,
            &as_current(&admin),
            &content,
            &RecipientCriteria::Filter {
                role: None,
                route_id: None,
            },
            &DeliveryQueue::noop(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
