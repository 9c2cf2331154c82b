//! # kiddiebus: School-Bus Boarding Tracker
//!
//! `kiddiebus` is the backend for a school-bus transportation service. It
//! tracks the fleet, routes, schools, and students; records pickup and
//! dropoff events from boarding devices; and fans notifications out to
//! parents through an in-app inbox with out-of-band email delivery.
//!
//! ## Overview
//!
//! The service sits behind an identity-aware proxy that authenticates every
//! request and forwards the caller's email in a trusted header (see
//! [`config::Config::identity_header`]). Three roles exist: admins run the
//! whole operation, operators manage their own routes and schools, and
//! parents see their own children, the routes those children ride, and their
//! own inbox.
//!
//! The boarding path is the hot path. A device resolves a card tap to a
//! student, posts a check-in, and the service records the event, closes out
//! retried taps via a per-day uniqueness rule, and notifies the parent. The
//! daily rule is enforced by a database unique index over (student, day,
//! direction), so concurrent submissions race on the index and exactly one
//! wins; the loser receives a structured 409 the device can treat as
//! success.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum) and all
//! persistence is PostgreSQL through the repository pattern in [`db`].
//! Notification fan-out ([`broadcast`]) resolves recipients and writes inbox
//! rows in a single transaction; a background delivery worker ([`delivery`])
//! picks the committed rows up over a channel and sends email off the
//! request path.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use kiddiebus::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = kiddiebus::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     kiddiebus::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
pub mod api;
pub mod auth;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod delivery;
mod email;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    openapi::ApiDoc,
};
use api::models::users::Role;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use chrono::FixedOffset;
pub use config::Config;
use delivery::DeliveryQueue;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{BoardingId, BusId, NotificationId, RouteId, SchoolId, StudentId, UserId};

/// Application state shared across all request handlers.
///
/// `reporting_offset` is the parsed form of
/// [`Config::reporting_timezone`](config::Config::reporting_timezone); it is
/// resolved once at startup so the check-in path never re-parses it.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub reporting_offset: FixedOffset,
    pub delivery: DeliveryQueue,
}

/// Get the kiddiebus database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: a user already holding the configured email is left untouched,
/// whatever their role. Returns the user id either way.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, db: &PgPool) -> anyhow::Result<UserId> {
    let mut conn = db.acquire().await?;
    let mut users = Users::new(&mut conn);

    if let Some(existing) = users.get_by_email(email).await? {
        return Ok(existing.id);
    }

    let created = users
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            first_name: "System".to_string(),
            last_name: "Admin".to_string(),
            phone: None,
            role: Role::Admin,
        })
        .await?;

    info!(email = %email, "Created initial admin user");
    Ok(created.id)
}

/// Connect to the database, run migrations, and ensure the bootstrap admin
/// exists.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.pool.max_connections)
        .min_connections(config.database.pool.min_connections)
        .acquire_timeout(config.database.pool.acquire_timeout)
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;

    create_initial_admin_user(&config.admin_email, &pool).await?;

    Ok(pool)
}

/// Build the application router: the management API under `/api/v1`, the
/// interactive docs at `/docs`, a health probe, and optional Prometheus
/// metrics.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> Router {
    let api_routes = Router::new()
        // User management and self-service profile
        .route("/users", get(api::handlers::users::list_users))
        .route("/users/{user_id}", get(api::handlers::users::get_user))
        .route("/users/{user_id}", put(api::handlers::users::update_user))
        .route("/users/{user_id}", delete(api::handlers::users::delete_user))
        .route("/me", get(api::handlers::users::get_me))
        .route("/me", put(api::handlers::users::update_me))
        // Fleet
        .route("/buses", get(api::handlers::buses::list_buses))
        .route("/buses", post(api::handlers::buses::create_bus))
        .route("/buses/{bus_id}", get(api::handlers::buses::get_bus))
        .route("/buses/{bus_id}", put(api::handlers::buses::update_bus))
        .route("/buses/{bus_id}", delete(api::handlers::buses::delete_bus))
        .route("/buses/{bus_id}/location", put(api::handlers::buses::update_bus_location))
        // Routes
        .route("/routes", get(api::handlers::routes::list_routes))
        .route("/routes", post(api::handlers::routes::create_route))
        .route("/routes/{route_id}", get(api::handlers::routes::get_route))
        .route("/routes/{route_id}", put(api::handlers::routes::update_route))
        .route("/routes/{route_id}", delete(api::handlers::routes::delete_route))
        .route("/routes/{route_id}/students", get(api::handlers::routes::route_students))
        // Schools
        .route("/schools", get(api::handlers::schools::list_schools))
        .route("/schools", post(api::handlers::schools::create_school))
        .route("/schools/all", get(api::handlers::schools::list_all_schools))
        .route("/schools/{school_id}", get(api::handlers::schools::get_school))
        .route("/schools/{school_id}", put(api::handlers::schools::update_school))
        .route("/schools/{school_id}", delete(api::handlers::schools::delete_school))
        .route("/schools/{school_id}/students", get(api::handlers::schools::school_students))
        // Students and check-in
        .route("/students", get(api::handlers::students::list_students))
        .route("/students", post(api::handlers::students::create_student))
        .route("/students/card/{card_id}", get(api::handlers::students::get_student_by_card))
        .route("/students/{student_id}", get(api::handlers::students::get_student))
        .route("/students/{student_id}", put(api::handlers::students::update_student))
        .route("/students/{student_id}", delete(api::handlers::students::delete_student))
        .route("/students/{student_id}/boardings", get(api::handlers::students::student_boardings))
        .route("/students/{student_id}/checkin", post(api::handlers::students::checkin))
        // Notifications
        .route("/notifications", get(api::handlers::notifications::list_notifications))
        .route("/notifications", post(api::handlers::notifications::send_notification))
        .route(
            "/notifications/broadcast",
            post(api::handlers::notifications::broadcast_notification),
        )
        .route("/notifications/read-all", post(api::handlers::notifications::mark_all_read))
        .route(
            "/notifications/{notification_id}",
            get(api::handlers::notifications::get_notification),
        )
        .route(
            "/notifications/{notification_id}",
            delete(api::handlers::notifications::delete_notification),
        )
        .route(
            "/notifications/{notification_id}/read",
            post(api::handlers::notifications::mark_read),
        )
        .with_state(state.clone());

    let mut router = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    router.layer(CorsLayer::permissive()).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to PostgreSQL, runs
///    migrations, creates the bootstrap admin, and starts the delivery worker
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
/// 3. **Shutdown**: the shutdown future resolves, the server drains, the
///    delivery worker is cancelled and awaited
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    shutdown_token: tokio_util::sync::CancellationToken,
    delivery_worker: tokio::task::JoinHandle<()>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;
        let reporting_offset = config.reporting_offset()?;

        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let (delivery, delivery_worker) = delivery::start_delivery_worker(pool.clone(), &config, shutdown_token.clone())?;

        let state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .reporting_offset(reporting_offset)
            .delivery(delivery)
            .build();

        let router = build_router(&state);

        Ok(Self {
            router,
            config,
            pool,
            shutdown_token,
            delivery_worker,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("kiddiebus listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Let the delivery worker drain before the pool goes away
        self.shutdown_token.cancel();
        let _ = self.delivery_worker.await;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::api::models::users::Role;
    use crate::db::handlers::{Repository, Routes, Students, Users};
    use crate::test_utils::{self, create_test_app};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_identity_header_is_unauthorized(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.get("/api/v1/me").await;
        assert_eq!(response.status_code().as_u16(), 401);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_bootstrap_admin_is_idempotent(pool: PgPool) {
        let first = crate::create_initial_admin_user("admin@kiddiebus.local", &pool).await.unwrap();
        let second = crate::create_initial_admin_user("admin@kiddiebus.local", &pool).await.unwrap();
        assert_eq!(first, second);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_checkin_twice_returns_structured_conflict(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn)
            .create(&test_utils::user_create("admin@example.com", Role::Admin))
            .await
            .unwrap();
        let parent = Users::new(&mut conn)
            .create(&test_utils::user_create("parent@example.com", Role::Parent))
            .await
            .unwrap();
        let bus = crate::db::handlers::Buses::new(&mut conn)
            .create(&test_utils::bus_create("PP1234"))
            .await
            .unwrap();
        let route = Routes::new(&mut conn)
            .create(&test_utils::route_create("North", admin.id, Some(bus.id)))
            .await
            .unwrap();
        let student = Students::new(&mut conn)
            .create(&test_utils::student_create(parent.id, Some(route.id)))
            .await
            .unwrap();
        drop(conn);

        let server = create_test_app(pool).await;
        let body = serde_json::json!({ "bus_id": bus.id, "boarding_type": "pickup" });

        let first = server
            .post(&format!("/api/v1/students/{}/checkin", student.id))
            .add_header("x-kiddiebus-user", "admin@example.com")
            .json(&body)
            .await;
        assert_eq!(first.status_code().as_u16(), 201);

        let second = server
            .post(&format!("/api/v1/students/{}/checkin", student.id))
            .add_header("x-kiddiebus-user", "admin@example.com")
            .json(&body)
            .await;
        assert_eq!(second.status_code().as_u16(), 409);
        let conflict: serde_json::Value = second.json();
        assert_eq!(conflict["error"], "duplicate_boarding");
        assert_eq!(conflict["boarding_type"], "pickup");

        // A dropoff is an independent counter and still goes through
        let dropoff = server
            .post(&format!("/api/v1/students/{}/checkin", student.id))
            .add_header("x-kiddiebus-user", "admin@example.com")
            .json(&serde_json::json!({ "bus_id": bus.id, "boarding_type": "dropoff" }))
            .await;
        assert_eq!(dropoff.status_code().as_u16(), 201);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_checkin_notifies_the_parent(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn)
            .create(&test_utils::user_create("admin@example.com", Role::Admin))
            .await
            .unwrap();
        let parent = Users::new(&mut conn)
            .create(&test_utils::user_create("parent@example.com", Role::Parent))
            .await
            .unwrap();
        let bus = crate::db::handlers::Buses::new(&mut conn)
            .create(&test_utils::bus_create("PP1234"))
            .await
            .unwrap();
        let route = Routes::new(&mut conn)
            .create(&test_utils::route_create("North", admin.id, Some(bus.id)))
            .await
            .unwrap();
        let student = Students::new(&mut conn)
            .create(&test_utils::student_create(parent.id, Some(route.id)))
            .await
            .unwrap();
        drop(conn);

        let server = create_test_app(pool).await;
        let response = server
            .post(&format!("/api/v1/students/{}/checkin", student.id))
            .add_header("x-kiddiebus-user", "admin@example.com")
            .json(&serde_json::json!({ "bus_id": bus.id, "boarding_type": "pickup" }))
            .await;
        assert_eq!(response.status_code().as_u16(), 201);

        let inbox = server
            .get("/api/v1/notifications")
            .add_header("x-kiddiebus-user", "parent@example.com")
            .await;
        let inbox: serde_json::Value = inbox.json();
        assert_eq!(inbox["unread_count"], 1);
        assert_eq!(inbox["notifications"][0]["notification_type"], "boarding");
        assert_eq!(inbox["notifications"][0]["related_student_id"], student.id.to_string());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_parents_only_see_their_own_inbox(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn)
            .create(&test_utils::user_create("admin@example.com", Role::Admin))
            .await
            .unwrap();
        let _parent_a = Users::new(&mut conn)
            .create(&test_utils::user_create("a@example.com", Role::Parent))
            .await
            .unwrap();
        let parent_b = Users::new(&mut conn)
            .create(&test_utils::user_create("b@example.com", Role::Parent))
            .await
            .unwrap();

        let notification_b = crate::db::handlers::Notifications::new(&mut conn)
            .create(admin.id, parent_b.id, &test_utils::notification_content("For B only"))
            .await
            .unwrap();
        drop(conn);

        let server = create_test_app(pool).await;

        let inbox_a = server
            .get("/api/v1/notifications")
            .add_header("x-kiddiebus-user", "a@example.com")
            .await;
        let inbox_a: serde_json::Value = inbox_a.json();
        assert_eq!(inbox_a["notifications"].as_array().unwrap().len(), 0);

        // Someone else's notification id reads as not-found
        let peek = server
            .get(&format!("/api/v1/notifications/{}", notification_b.id))
            .add_header("x-kiddiebus-user", "a@example.com")
            .await;
        assert_eq!(peek.status_code().as_u16(), 404);

        let own = server
            .get(&format!("/api/v1/notifications/{}", notification_b.id))
            .add_header("x-kiddiebus-user", "b@example.com")
            .await;
        assert_eq!(own.status_code().as_u16(), 200);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_broadcast_deduplicates_and_counts(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn)
            .create(&test_utils::user_create("admin@example.com", Role::Admin))
            .await
            .unwrap();
        let parent = Users::new(&mut conn)
            .create(&test_utils::user_create("parent@example.com", Role::Parent))
            .await
            .unwrap();
        let route = Routes::new(&mut conn)
            .create(&test_utils::route_create("North", admin.id, None))
            .await
            .unwrap();
        // Two children on the same route: one notification, not two
        Students::new(&mut conn)
            .create(&test_utils::student_create(parent.id, Some(route.id)))
            .await
            .unwrap();
        Students::new(&mut conn)
            .create(&test_utils::student_create(parent.id, Some(route.id)))
            .await
            .unwrap();
        drop(conn);

        let server = create_test_app(pool).await;
        let response = server
            .post("/api/v1/notifications/broadcast")
            .add_header("x-kiddiebus-user", "admin@example.com")
            .json(&serde_json::json!({
                "title": "Bus delayed",
                "message": "Route North is running 15 minutes late.",
                "route_id": route.id,
            }))
            .await;
        assert_eq!(response.status_code().as_u16(), 201);
        let outcome: serde_json::Value = response.json();
        assert_eq!(outcome["created_count"], 1);

        // Parents cannot broadcast
        let forbidden = server
            .post("/api/v1/notifications/broadcast")
            .add_header("x-kiddiebus-user", "parent@example.com")
            .json(&serde_json::json!({ "title": "Hi", "message": "all" }))
            .await;
        assert_eq!(forbidden.status_code().as_u16(), 403);
    }
}
