//! Extractor resolving the trusted identity header to an active account.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    db::{errors::DbError, handlers::Users},
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let header_name = &state.config.identity_header;
        let email = match parts.headers.get(header_name).map(|h| h.to_str()) {
            Some(Ok(email)) => email,
            Some(Err(_)) => {
                return Err(Error::BadRequest {
                    message: format!("Invalid {header_name} header"),
                });
            }
            None => {
                trace!("No identity header on request");
                return Err(Error::Unauthenticated { message: None });
            }
        };

        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        let user = Users::new(&mut conn).get_active_by_email(email).await?;

        match user {
            Some(user) => {
                debug!(user_id = %user.id, "Authenticated via identity header");
                Ok(CurrentUser::from(user))
            }
            // Unknown and deactivated accounts are indistinguishable to the
            // caller.
            None => Err(Error::Unauthenticated {
                message: Some("Unknown or inactive account".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::users::{CurrentUser, Role},
        db::handlers::{Repository, Users},
        test_utils,
    };
    use axum::{extract::FromRequestParts as _, http::request::Parts};
    use sqlx::PgPool;

    fn parts_with_header(header_name: &str, header_value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(header_name, header_value)
            .body(())
            .unwrap();
        let (parts, _body) = request.into_parts();
        parts
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_existing_user_extraction(pool: PgPool) {
        let state = test_utils::create_test_state(pool.clone());

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&test_utils::user_create("rider@example.com", Role::Parent))
            .await
            .unwrap();

        let mut parts = parts_with_header("x-kiddiebus-user", &user.email);
        let current = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.role, Role::Parent);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_email_rejected(pool: PgPool) {
        let state = test_utils::create_test_state(pool);

        let mut parts = parts_with_header("x-kiddiebus-user", "nobody@example.com");
        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_deactivated_account_rejected(pool: PgPool) {
        let state = test_utils::create_test_state(pool.clone());

        let mut conn = pool.acquire().await.unwrap();
        let mut users = Users::new(&mut conn);
        let user = users
            .create(&test_utils::user_create("former@example.com", Role::Operator))
            .await
            .unwrap();
        users.delete(user.id).await.unwrap();

        let mut parts = parts_with_header("x-kiddiebus-user", "former@example.com");
        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_header_rejected(pool: PgPool) {
        let state = test_utils::create_test_state(pool);

        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
